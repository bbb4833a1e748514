use crate::broadcast::BroadcastTransport;
use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::Role;
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_export_workbook<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(kind) = req.params.get("kind").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.kind", None);
    };

    let view = state.engine.view().await;
    let Some(teacher) = view.teacher.as_ref() else {
        return err(&req.id, "not_logged_in", "no active session", None);
    };

    let workbook = match kind {
        "classes" => export::class_report_workbook(&view.classes),
        "admin" => {
            if teacher.role != Role::Admin {
                return err(
                    &req.id,
                    "forbidden",
                    "admin export requires the admin role",
                    None,
                );
            }
            export::admin_workbook(&view.global.teachers, &view.global.classes, &view.global.matches)
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown export kind: {}", other),
                None,
            )
        }
    };

    match serde_json::to_value(&workbook) {
        Ok(v) => ok(&req.id, json!({ "workbook": v })),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "export.workbook" => Some(handle_export_workbook(state, req).await),
        _ => None,
    }
}

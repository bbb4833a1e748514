use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::Teacher;
use crate::remote::RemoteStore;
use serde_json::json;

fn parse_teacher(req: &Request) -> Result<Teacher, serde_json::Value> {
    let Some(raw) = req.params.get("teacher") else {
        return Err(err(&req.id, "bad_params", "missing params.teacher", None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))
}

async fn handle_teachers_create<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let teacher = match parse_teacher(req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let teacher_id = teacher.id.clone();
    match state.engine.create_teacher(teacher).await {
        Ok(()) => ok(&req.id, json!({ "teacherId": teacher_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_teachers_update<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let teacher = match parse_teacher(req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let teacher_id = teacher.id.clone();
    match state.engine.update_teacher(teacher).await {
        Ok(()) => ok(&req.id, json!({ "teacherId": teacher_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_teachers_delete<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(teacher_id) = req.params.get("teacherId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.teacherId", None);
    };
    match state.engine.delete_teacher(teacher_id).await {
        Ok(()) => ok(&req.id, json!({ "teacherId": teacher_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "teachers.create" => Some(handle_teachers_create(state, req).await),
        "teachers.update" => Some(handle_teachers_update(state, req).await),
        "teachers.delete" => Some(handle_teachers_delete(state, req).await),
        _ => None,
    }
}

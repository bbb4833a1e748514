use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::RemoteStore;
use serde_json::json;
use std::path::PathBuf;

async fn handle_backup_create<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match state.engine.create_backup(&PathBuf::from(path)).await {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": path,
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
            }),
        ),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_backup_restore<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(path) = req.params.get("path").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    match state.engine.restore_from_backup(&PathBuf::from(path)).await {
        Ok(()) => ok(&req.id, json!({ "restored": true })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.create" => Some(handle_backup_create(state, req).await),
        "backup.restore" => Some(handle_backup_restore(state, req).await),
        _ => None,
    }
}

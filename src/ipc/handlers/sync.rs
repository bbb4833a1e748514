use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_sync_force<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    match state.engine.force_sync().await {
        Ok(()) => ok(&req.id, json!({ "synced": true })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sync.force" => Some(handle_sync_force(state, req).await),
        _ => None,
    }
}

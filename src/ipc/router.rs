use super::handlers;
use super::types::{AppState, Request};
use crate::broadcast::BroadcastTransport;
use crate::ipc::error::err;
use crate::remote::RemoteStore;

pub async fn handle_request<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: Request,
) -> serde_json::Value {
    if let Some(resp) = handlers::session::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::classes::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::matches::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::teachers::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::sync::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::backup::try_handle(state, &req).await {
        return resp;
    }
    if let Some(resp) = handlers::export::try_handle(state, &req).await {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

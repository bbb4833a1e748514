use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_login<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(username) = req.params.get("username").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.username", None);
    };
    let password = req
        .params
        .get("password")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match state
        .engine
        .login_with_credentials(username, password, &state.verifier)
        .await
    {
        Ok(teacher) => ok(&req.id, json!({ "teacher": teacher })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_resume<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    match state.engine.resume().await {
        Ok(Some(teacher)) => ok(&req.id, json!({ "resumed": true, "teacher": teacher })),
        Ok(None) => ok(&req.id, json!({ "resumed": false })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_logout<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    state.engine.logout().await;
    ok(&req.id, json!({ "loggedOut": true }))
}

async fn handle_state<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let view = state.engine.view().await;
    match serde_json::to_value(&view) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

async fn handle_clear<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    match state.engine.clear_data().await {
        Ok(()) => ok(&req.id, json!({ "cleared": true })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_view<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let current_view = req
        .params
        .get("currentView")
        .and_then(|v| v.as_str())
        .map(String::from);
    let active_tab = req
        .params
        .get("activeTab")
        .and_then(|v| v.as_str())
        .map(String::from);
    match state.engine.set_ui_state(current_view, active_tab).await {
        Ok(()) => ok(&req.id, json!({ "saved": true })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.login" => Some(handle_login(state, req).await),
        "session.resume" => Some(handle_resume(state, req).await),
        "session.logout" => Some(handle_logout(state, req).await),
        "session.state" => Some(handle_state(state, req).await),
        "session.clear" => Some(handle_clear(state, req).await),
        "session.view" => Some(handle_view(state, req).await),
        _ => None,
    }
}

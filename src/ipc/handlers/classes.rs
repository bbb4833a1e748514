use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::ClassRoom;
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_classes_set<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(raw) = req.params.get("classes") else {
        return err(&req.id, "bad_params", "missing params.classes", None);
    };
    let classes: Vec<ClassRoom> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let count = classes.len();
    match state.engine.set_classes(classes).await {
        Ok(()) => ok(&req.id, json!({ "count": count })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_classes_update<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(raw) = req.params.get("class") else {
        return err(&req.id, "bad_params", "missing params.class", None);
    };
    let class: ClassRoom = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let class_id = class.id.clone();
    match state.engine.update_class(class).await {
        Ok(()) => ok(&req.id, json!({ "classId": class_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_classes_delete<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(class_id) = req.params.get("classId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.classId", None);
    };
    match state.engine.delete_class(class_id).await {
        Ok(()) => ok(&req.id, json!({ "classId": class_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.set" => Some(handle_classes_set(state, req).await),
        "classes.update" => Some(handle_classes_update(state, req).await),
        "classes.delete" => Some(handle_classes_delete(state, req).await),
        _ => None,
    }
}

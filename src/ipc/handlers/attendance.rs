use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::AttendanceRecord;
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_attendance_set<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(raw) = req.params.get("attendance") else {
        return err(&req.id, "bad_params", "missing params.attendance", None);
    };
    let attendance: Vec<AttendanceRecord> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let count = attendance.len();
    match state.engine.set_attendance(attendance).await {
        Ok(()) => ok(&req.id, json!({ "count": count })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.set" => Some(handle_attendance_set(state, req).await),
        _ => None,
    }
}

use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::SoftSkillRating;
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_students_delete<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(class_id) = req.params.get("classId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.classId", None);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };
    match state.engine.delete_student(class_id, student_id).await {
        Ok(()) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_students_rate<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(class_id) = req.params.get("classId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.classId", None);
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };
    let Some(raw) = req.params.get("rating") else {
        return err(&req.id, "bad_params", "missing params.rating", None);
    };
    let rating: SoftSkillRating = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    match state
        .engine
        .add_soft_skill_rating(class_id, student_id, rating)
        .await
    {
        Ok(()) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.delete" => Some(handle_students_delete(state, req).await),
        "students.rate" => Some(handle_students_rate(state, req).await),
        _ => None,
    }
}

use crate::error::EngineError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Maps an engine failure to its stable wire code. Schedule conflicts carry
/// structured details so the client can show who is double-booked.
pub fn engine_err(id: &str, e: &EngineError) -> serde_json::Value {
    let details = match e {
        EngineError::ScheduleConflict {
            match_id,
            match_description,
            students,
        } => Some(json!({
            "matchId": match_id,
            "matchDescription": match_description,
            "students": students,
        })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}

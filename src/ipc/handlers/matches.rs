use crate::broadcast::BroadcastTransport;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::models::{Match, MatchWinner};
use crate::remote::RemoteStore;
use serde_json::json;

async fn handle_matches_set<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(raw) = req.params.get("matches") else {
        return err(&req.id, "bad_params", "missing params.matches", None);
    };
    let matches: Vec<Match> = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let count = matches.len();
    match state.engine.set_matches(matches).await {
        Ok(()) => ok(&req.id, json!({ "count": count })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_matches_create<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(raw) = req.params.get("match") else {
        return err(&req.id, "bad_params", "missing params.match", None);
    };
    let m: Match = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let match_id = m.id.clone();
    match state.engine.create_match(m).await {
        Ok(()) => ok(&req.id, json!({ "matchId": match_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_matches_delete<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(match_id) = req.params.get("matchId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.matchId", None);
    };
    match state.engine.delete_match(match_id).await {
        Ok(()) => ok(&req.id, json!({ "matchId": match_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

async fn handle_matches_result<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> serde_json::Value {
    let Some(match_id) = req.params.get("matchId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.matchId", None);
    };
    let Some(raw) = req.params.get("winner") else {
        return err(&req.id, "bad_params", "missing params.winner", None);
    };
    let winner: MatchWinner = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(_) => {
            return err(
                &req.id,
                "bad_params",
                "winner must be team1 or team2",
                None,
            )
        }
    };
    match state.engine.record_match_result(match_id, winner).await {
        Ok(()) => ok(&req.id, json!({ "matchId": match_id })),
        Err(e) => engine_err(&req.id, &e),
    }
}

pub async fn try_handle<R: RemoteStore, T: BroadcastTransport>(
    state: &AppState<R, T>,
    req: &Request,
) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "matches.set" => Some(handle_matches_set(state, req).await),
        "matches.create" => Some(handle_matches_create(state, req).await),
        "matches.delete" => Some(handle_matches_delete(state, req).await),
        "matches.result" => Some(handle_matches_result(state, req).await),
        _ => None,
    }
}

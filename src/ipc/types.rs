use crate::auth::Sha256Verifier;
use crate::broadcast::BroadcastTransport;
use crate::remote::RemoteStore;
use crate::sync::engine::SyncEngine;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-process daemon state shared by every handler.
pub struct AppState<R: RemoteStore, T: BroadcastTransport> {
    pub engine: SyncEngine<R, T>,
    pub verifier: Sha256Verifier,
}

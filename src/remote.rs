use crate::error::EngineError;
use crate::models::{AttendanceRecord, ClassRoom, GlobalData, Match, Teacher};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Write payload for the sync endpoint. Any subset of the collections may be
/// present; the remote replaces each present collection wholesale and, when
/// `current_teacher` is set, associates authorship with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<Teacher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassRoom>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<Match>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Vec<AttendanceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_teacher: Option<Teacher>,
}

/// Boundary to the remote store. All-or-nothing semantics: a non-2xx status
/// or transport failure is `RemoteUnavailable` and the caller must not assume
/// any partial result. No retries happen at this layer.
pub trait RemoteStore: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<GlobalData, EngineError>> + Send;
    fn push_partial(
        &self,
        payload: &SyncPayload,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
    fn delete_teacher(
        &self,
        teacher_id: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

pub struct HttpRemoteStore {
    client: reqwest::Client,
    url: String,
}

impl HttpRemoteStore {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> EngineError {
    EngineError::RemoteUnavailable(e.to_string())
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self) -> Result<GlobalData, EngineError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?;
        if !resp.status().is_success() {
            return Err(unavailable(format!("GET status {}", resp.status())));
        }
        let data: GlobalData = resp.json().await.map_err(unavailable)?;
        log::debug!(
            "fetched global data: {} teachers, {} classes, {} matches, {} attendance",
            data.teachers.len(),
            data.classes.len(),
            data.matches.len(),
            data.attendance.len()
        );
        Ok(data)
    }

    async fn push_partial(&self, payload: &SyncPayload) -> Result<(), EngineError> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(unavailable)?;
        if !resp.status().is_success() {
            return Err(unavailable(format!("POST status {}", resp.status())));
        }
        Ok(())
    }

    async fn delete_teacher(&self, teacher_id: &str) -> Result<(), EngineError> {
        let resp = self
            .client
            .delete(&self.url)
            .json(&serde_json::json!({ "teacherId": teacher_id }))
            .send()
            .await
            .map_err(unavailable)?;
        if !resp.status().is_success() {
            return Err(unavailable(format!("DELETE status {}", resp.status())));
        }
        Ok(())
    }
}

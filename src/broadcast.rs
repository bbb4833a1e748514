use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;

/// One change notification from another session. For `"data_updated"` the
/// `data` payload carries the full updated collections so receivers never
/// need a follow-up read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub timestamp: f64,
}

pub const DATA_UPDATED: &str = "data_updated";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub last_seen: f64,
}

/// Poll response: changes since the cursor plus the server's new cursor
/// timestamp (monotonic, prevents re-delivery).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub changes: Vec<ChangeRecord>,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub online_users: Vec<OnlineUser>,
}

#[derive(Debug)]
pub struct BroadcastError(pub String);

impl fmt::Display for BroadcastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broadcast channel error: {}", self.0)
    }
}

impl std::error::Error for BroadcastError {}

/// Transport behind the change-broadcast channel. The behavioral contract is
/// "deliver changes since cursor X, monotonically"; long polling over HTTP is
/// just the production implementation.
pub trait BroadcastTransport: Send + Sync + 'static {
    fn poll(
        &self,
        since: f64,
        user_id: &str,
        user_name: &str,
    ) -> impl Future<Output = Result<PollResponse, BroadcastError>> + Send;
    fn publish(
        &self,
        kind: &str,
        data: &serde_json::Value,
        author: &str,
    ) -> impl Future<Output = Result<(), BroadcastError>> + Send;
}

pub struct HttpBroadcastTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpBroadcastTransport {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl BroadcastTransport for HttpBroadcastTransport {
    async fn poll(
        &self,
        since: f64,
        user_id: &str,
        user_name: &str,
    ) -> Result<PollResponse, BroadcastError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("since", since.to_string()),
                ("userId", user_id.to_string()),
                ("userName", user_name.to_string()),
            ])
            .send()
            .await
            .map_err(|e| BroadcastError(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BroadcastError(format!("poll status {}", resp.status())));
        }
        resp.json().await.map_err(|e| BroadcastError(e.to_string()))
    }

    async fn publish(
        &self,
        kind: &str,
        data: &serde_json::Value,
        author: &str,
    ) -> Result<(), BroadcastError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "type": kind,
                "data": data,
                "author": author,
            }))
            .send()
            .await
            .map_err(|e| BroadcastError(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(BroadcastError(format!("publish status {}", resp.status())));
        }
        Ok(())
    }
}

type ChangeHandler = Box<dyn Fn(Vec<ChangeRecord>) + Send + Sync>;

struct ClientState {
    active: bool,
    cursor: f64,
    user_id: String,
    user_name: String,
    task: Option<JoinHandle<()>>,
}

struct Inner<T> {
    transport: T,
    poll_interval: Duration,
    state: Mutex<ClientState>,
    handler: Mutex<Option<ChangeHandler>>,
}

/// Pseudo-realtime change channel over a fixed-interval poll loop. A failed
/// poll tick is logged and retried on the next tick; `disconnect` is safe to
/// call repeatedly and from a torn-down state.
pub struct BroadcastClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BroadcastClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

impl<T: BroadcastTransport> BroadcastClient<T> {
    pub fn new(transport: T, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                poll_interval,
                state: Mutex::new(ClientState {
                    active: false,
                    cursor: 0.0,
                    user_id: String::new(),
                    user_name: String::new(),
                    task: None,
                }),
                handler: Mutex::new(None),
            }),
        }
    }

    /// Registers the delivery callback. A single slot: a later registration
    /// replaces the earlier one.
    pub fn on_changes(&self, handler: impl Fn(Vec<ChangeRecord>) + Send + Sync + 'static) {
        *self.inner.handler.lock().expect("handler lock") = Some(Box::new(handler));
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().expect("state lock").active
    }

    /// Starts the poll loop. The cursor starts at "now" so only changes made
    /// after connecting are delivered. A no-op when already connected.
    pub fn connect(&self, user_id: &str, user_name: &str) {
        {
            let mut st = self.inner.state.lock().expect("state lock");
            if st.active {
                return;
            }
            st.active = true;
            st.cursor = unix_now();
            st.user_id = user_id.to_string();
            st.user_name = user_name.to_string();
        }
        log::info!("broadcast: connecting as {} ({})", user_name, user_id);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            loop {
                let (since, user_id, user_name) = {
                    let st = inner.state.lock().expect("state lock");
                    if !st.active {
                        break;
                    }
                    (st.cursor, st.user_id.clone(), st.user_name.clone())
                };

                match inner.transport.poll(since, &user_id, &user_name).await {
                    Ok(resp) => {
                        if !resp.online_users.is_empty() {
                            log::debug!("broadcast: {} users online", resp.online_users.len());
                        }
                        if !resp.changes.is_empty() {
                            log::debug!("broadcast: received {} changes", resp.changes.len());
                            {
                                let mut st = inner.state.lock().expect("state lock");
                                st.cursor = resp.timestamp;
                            }
                            if let Some(handler) =
                                inner.handler.lock().expect("handler lock").as_ref()
                            {
                                handler(resp.changes);
                            }
                        }
                    }
                    Err(e) => {
                        // Single tick failure; the loop keeps running.
                        log::warn!("broadcast: poll failed: {}", e);
                    }
                }

                tokio::time::sleep(inner.poll_interval).await;
            }
        });
        self.inner.state.lock().expect("state lock").task = Some(task);
    }

    /// Stops the poll loop. Idempotent.
    pub fn disconnect(&self) {
        let task = {
            let mut st = self.inner.state.lock().expect("state lock");
            st.active = false;
            st.task.take()
        };
        if let Some(task) = task {
            task.abort();
            log::info!("broadcast: disconnected");
        }
    }

    /// Publishes a change record. Callers must handle the error themselves so
    /// a failed announce never tears down anything else.
    pub async fn publish(
        &self,
        kind: &str,
        data: &serde_json::Value,
        author: &str,
    ) -> Result<(), BroadcastError> {
        self.inner.transport.publish(kind, data, author).await?;
        log::debug!("broadcast: sent {} by {}", kind, author);
        Ok(())
    }
}

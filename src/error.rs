use std::fmt;

/// Engine-level failure taxonomy. Network-boundary failures are converted to
/// these at the call site and reported to the caller; they never escape as
/// panics or unhandled rejections.
#[derive(Debug)]
pub enum EngineError {
    /// Any failed GET/POST/DELETE against the sync endpoint. Local state is
    /// left at the last good value; the next debounce cycle or an explicit
    /// force sync is the retry path.
    RemoteUnavailable(String),
    /// Business-rule rejection: a student in the new match is already booked
    /// in another match at the same date and time. Nothing was mutated.
    ScheduleConflict {
        match_id: String,
        match_description: String,
        students: Vec<String>,
    },
    /// Wrong credential, unknown username, or an account with no password.
    AuthFailure(String),
    /// The resumed session references a teacher that no longer exists in the
    /// just-fetched global data; the local session was cleared.
    StaleAccount,
    /// Rejected before any mutation: bad or missing input.
    Validation(String),
    /// Local snapshot store failure.
    Storage(String),
    /// Operation requires a logged-in session.
    NotLoggedIn,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::RemoteUnavailable(msg) => write!(f, "remote store unavailable: {}", msg),
            EngineError::ScheduleConflict {
                match_description,
                students,
                ..
            } => write!(
                f,
                "schedule conflict with {}: students {}",
                match_description,
                students.join(", ")
            ),
            EngineError::AuthFailure(msg) => write!(f, "authentication failed: {}", msg),
            EngineError::StaleAccount => write!(f, "saved account no longer exists"),
            EngineError::Validation(msg) => write!(f, "{}", msg),
            EngineError::Storage(msg) => write!(f, "local storage error: {}", msg),
            EngineError::NotLoggedIn => write!(f, "not logged in"),
        }
    }
}

impl std::error::Error for EngineError {}

impl EngineError {
    /// Stable string code used in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::RemoteUnavailable(_) => "remote_unavailable",
            EngineError::ScheduleConflict { .. } => "schedule_conflict",
            EngineError::AuthFailure(_) => "auth_failed",
            EngineError::StaleAccount => "stale_account",
            EngineError::Validation(_) => "bad_params",
            EngineError::Storage(_) => "storage_failed",
            EngineError::NotLoggedIn => "not_logged_in",
        }
    }
}

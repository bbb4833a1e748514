use crate::error::EngineError;
use crate::models::{AppStateSnapshot, GlobalData};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const APP_STATE_KEY: &str = "app_state";
const GLOBAL_DATA_KEY: &str = "global_data";

/// Durable local key-value store: one key for the resumable session blob, one
/// for the last known global dataset (offline-first cache). Both are read and
/// written as whole-document JSON; there is no partial-key access.
pub struct SnapshotStore {
    conn: Mutex<Connection>,
}

fn storage_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Storage(e.to_string())
}

impl SnapshotStore {
    pub fn open(workspace: &Path) -> Result<Self, EngineError> {
        std::fs::create_dir_all(workspace).map_err(storage_err)?;
        let db_path = workspace.join("classtrack.sqlite3");
        let conn = Connection::open(db_path).map_err(storage_err)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests and ephemeral sessions.
    pub fn open_in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<(), EngineError> {
        let conn = self.conn.lock().expect("kv lock");
        conn.execute(
            "INSERT INTO kv(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (key, value),
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        let conn = self.conn.lock().expect("kv lock");
        conn.query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()
            .map_err(storage_err)
    }

    fn delete(&self, key: &str) -> Result<(), EngineError> {
        let conn = self.conn.lock().expect("kv lock");
        conn.execute("DELETE FROM kv WHERE key = ?", [key])
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn save_app_state(&self, state: &AppStateSnapshot) -> Result<(), EngineError> {
        let blob = serde_json::to_string(state).map_err(storage_err)?;
        self.put(APP_STATE_KEY, &blob)
    }

    pub fn load_app_state(&self) -> Result<Option<AppStateSnapshot>, EngineError> {
        match self.get(APP_STATE_KEY)? {
            // A corrupt blob is treated as no saved session rather than a
            // hard failure; the user just logs in again.
            Some(blob) => Ok(serde_json::from_str(&blob).ok()),
            None => Ok(None),
        }
    }

    pub fn clear_app_state(&self) -> Result<(), EngineError> {
        self.delete(APP_STATE_KEY)
    }

    pub fn save_global(&self, data: &GlobalData) -> Result<(), EngineError> {
        let blob = serde_json::to_string(data).map_err(storage_err)?;
        self.put(GLOBAL_DATA_KEY, &blob)
    }

    pub fn load_global(&self) -> Result<Option<GlobalData>, EngineError> {
        match self.get(GLOBAL_DATA_KEY)? {
            Some(blob) => Ok(serde_json::from_str(&blob).ok()),
            None => Ok(None),
        }
    }
}

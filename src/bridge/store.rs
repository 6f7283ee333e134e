//! Thread -> session mapping and per-session state, backed by SQLite.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use crate::errors::BridgeError;

/// Session store shared by all bridge workers.
pub struct SessionStore {
    db: Mutex<Connection>,
}

impl SessionStore {
    /// Open or create the session database.
    pub fn open(path: &Path) -> Result<Self, BridgeError> {
        let db = Connection::open(path)?;
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS thread_sessions (
                thread_ts TEXT PRIMARY KEY,
                session_id TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS session_state (
                session_id TEXT PRIMARY KEY,
                state TEXT NOT NULL
            );",
        )?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, BridgeError> {
        Self::open(Path::new(":memory:"))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session_for_thread(&self, thread_ts: &str) -> Result<Option<String>, BridgeError> {
        let db = self.lock();
        let session = db
            .query_row(
                "SELECT session_id FROM thread_sessions WHERE thread_ts = ?1",
                rusqlite::params![thread_ts],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(session)
    }

    /// Point a thread at a session, replacing any earlier binding.
    pub fn bind_thread(&self, thread_ts: &str, session_id: &str) -> Result<(), BridgeError> {
        let db = self.lock();
        db.execute(
            "INSERT INTO thread_sessions (thread_ts, session_id) VALUES (?1, ?2)
             ON CONFLICT(thread_ts) DO UPDATE SET session_id = excluded.session_id",
            rusqlite::params![thread_ts, session_id],
        )?;
        Ok(())
    }

    /// The thread's session, creating and binding `new_id()` on first use.
    pub fn get_or_create_session<F>(&self, thread_ts: &str, new_id: F) -> Result<String, BridgeError>
    where
        F: FnOnce() -> String,
    {
        if let Some(existing) = self.session_for_thread(thread_ts)? {
            return Ok(existing);
        }
        let session_id = new_id();
        self.bind_thread(thread_ts, &session_id)?;
        tracing::debug!(thread = %thread_ts, session = %session_id, "Created session");
        Ok(session_id)
    }

    pub fn save_state(&self, session_id: &str, state: &serde_json::Value) -> Result<(), BridgeError> {
        let db = self.lock();
        db.execute(
            "INSERT INTO session_state (session_id, state) VALUES (?1, ?2)
             ON CONFLICT(session_id) DO UPDATE SET state = excluded.state",
            rusqlite::params![session_id, state.to_string()],
        )?;
        Ok(())
    }

    /// Stored state; unparseable rows are treated as absent.
    pub fn load_state(&self, session_id: &str) -> Result<Option<serde_json::Value>, BridgeError> {
        let db = self.lock();
        let text = db
            .query_row(
                "SELECT state FROM session_state WHERE session_id = ?1",
                rusqlite::params![session_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(text.and_then(|t| match serde_json::from_str(&t) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(session = %session_id, error = %err, "Dropping unreadable session state");
                None
            }
        }))
    }
}

//! Persistence adapters for the conversation store

use super::{StoreError, StoreResult, StoreState};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Current on-disk format version
pub const STATE_VERSION: u32 = 0;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS kv_store (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Envelope written under the store name
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    state: StoreState,
    version: u32,
}

/// Named, whole-record persistence for store state
pub trait StatePersistence {
    /// Load the record stored under `name`, if any
    ///
    /// # Errors
    ///
    /// Fails when the record cannot be read or decoded.
    fn load(&self, name: &str) -> StoreResult<Option<StoreState>>;

    /// Replace the record stored under `name`
    ///
    /// # Errors
    ///
    /// Fails when the record cannot be encoded or written.
    fn save(&mut self, name: &str, state: &StoreState) -> StoreResult<()>;
}

fn encode(state: &StoreState) -> StoreResult<String> {
    Ok(serde_json::to_string(&PersistedState {
        state: state.clone(),
        version: STATE_VERSION,
    })?)
}

fn decode(raw: &str) -> StoreResult<StoreState> {
    let persisted: PersistedState = serde_json::from_str(raw)?;
    if persisted.version > STATE_VERSION {
        return Err(StoreError::UnsupportedVersion(persisted.version));
    }
    Ok(persisted.state)
}

/// SQLite-backed key-value record
pub struct SqlitePersistence {
    conn: Connection,
}

impl SqlitePersistence {
    /// Open or create the state file at the given path
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or its table created.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory database (for testing)
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or its table created.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl StatePersistence for SqlitePersistence {
    fn load(&self, name: &str) -> StoreResult<Option<StoreState>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        raw.as_deref().map(decode).transpose()
    }

    fn save(&mut self, name: &str, state: &StoreState) -> StoreResult<()> {
        let value = encode(state)?;
        self.conn.execute(
            "INSERT INTO kv_store (name, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![name, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Process-local persistence, kept as serialized records
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: HashMap<String, String>,
}

impl MemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized record, as it would appear on disk
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.records.get(name).map(String::as_str)
    }
}

impl StatePersistence for MemoryPersistence {
    fn load(&self, name: &str) -> StoreResult<Option<StoreState>> {
        self.raw(name).map(decode).transpose()
    }

    fn save(&mut self, name: &str, state: &StoreState) -> StoreResult<()> {
        self.records.insert(name.to_string(), encode(state)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Conversation;

    fn sample_state() -> StoreState {
        let conv = Conversation::new("Trip plans");
        StoreState {
            current_conversation_id: Some(conv.id.clone()),
            conversations: vec![conv],
        }
    }

    #[test]
    fn test_sqlite_missing_record_is_none() {
        let db = SqlitePersistence::open_in_memory().unwrap();
        assert!(db.load("chat-storage").unwrap().is_none());
    }

    #[test]
    fn test_sqlite_save_overwrites_record() {
        let mut db = SqlitePersistence::open_in_memory().unwrap();
        db.save("chat-storage", &StoreState::default()).unwrap();
        let state = sample_state();
        db.save("chat-storage", &state).unwrap();
        assert_eq!(db.load("chat-storage").unwrap(), Some(state));
        assert!(db.load("other").unwrap().is_none());
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let state = sample_state();
        {
            let mut db = SqlitePersistence::open(&path).unwrap();
            db.save("chat-storage", &state).unwrap();
        }
        let db = SqlitePersistence::open(&path).unwrap();
        assert_eq!(db.load("chat-storage").unwrap(), Some(state));
    }

    #[test]
    fn test_record_envelope_carries_version() {
        let mut mem = MemoryPersistence::new();
        mem.save("chat-storage", &sample_state()).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(mem.raw("chat-storage").unwrap()).unwrap();
        assert_eq!(raw["version"], 0);
        assert!(raw["state"]["conversations"].is_array());
    }

    #[test]
    fn test_future_version_is_rejected() {
        let raw = r#"{"state":{"conversations":[],"currentConversationId":null},"version":7}"#;
        assert!(matches!(decode(raw), Err(StoreError::UnsupportedVersion(7))));
    }
}

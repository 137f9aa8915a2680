//! Persisted conversation store
//!
//! State changes go through the pure [`reduce`] function; the store then
//! writes the whole new state through its persistence adapter.

mod persistence;
mod state;

#[cfg(test)]
mod proptests;

pub use persistence::{MemoryPersistence, SqlitePersistence, StatePersistence, STATE_VERSION};
pub use state::{reduce, Conversation, ConversationPatch, StoreAction, StoreState};

use thiserror::Error;

/// Fixed key the conversation list is persisted under
pub const STORE_NAME: &str = "chat-storage";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unsupported state version: {0}")]
    UnsupportedVersion(u32),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conversation list plus the active pointer, written through on every change
pub struct ConversationStore<P: StatePersistence> {
    name: String,
    state: StoreState,
    persistence: P,
}

impl<P: StatePersistence> ConversationStore<P> {
    /// Load the record under [`STORE_NAME`], or start empty
    ///
    /// # Errors
    ///
    /// Fails when the stored record cannot be read or decoded.
    pub fn load(persistence: P) -> StoreResult<Self> {
        Self::load_named(persistence, STORE_NAME)
    }

    /// Load the record under `name`, or start empty
    ///
    /// # Errors
    ///
    /// Fails when the stored record cannot be read or decoded.
    pub fn load_named(persistence: P, name: &str) -> StoreResult<Self> {
        let state = persistence.load(name)?.unwrap_or_default();
        tracing::debug!(
            name,
            conversations = state.conversations.len(),
            "Loaded conversation store"
        );
        Ok(Self {
            name: name.to_string(),
            state,
            persistence,
        })
    }

    #[must_use]
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    #[must_use]
    pub fn current_conversation_id(&self) -> Option<&str> {
        self.state.current_conversation_id.as_deref()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.state.get(id)
    }

    #[must_use]
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// # Errors
    ///
    /// Fails when the new state cannot be saved; memory is updated anyway.
    pub fn set_current_conversation(&mut self, id: Option<String>) -> StoreResult<()> {
        self.dispatch(StoreAction::SetCurrent(id))
    }

    /// # Errors
    ///
    /// Fails when the new state cannot be saved; memory is updated anyway.
    pub fn add_conversation(&mut self, conversation: Conversation) -> StoreResult<()> {
        self.dispatch(StoreAction::Add(conversation))
    }

    /// # Errors
    ///
    /// Fails when the new state cannot be saved; memory is updated anyway.
    pub fn update_conversation(&mut self, id: &str, patch: ConversationPatch) -> StoreResult<()> {
        self.dispatch(StoreAction::Update {
            id: id.to_string(),
            patch,
        })
    }

    /// # Errors
    ///
    /// Fails when the new state cannot be saved; memory is updated anyway.
    pub fn delete_conversation(&mut self, id: &str) -> StoreResult<()> {
        self.dispatch(StoreAction::Delete(id.to_string()))
    }

    /// Apply an action and write the result through.
    ///
    /// The in-memory state keeps the new value even if the write fails.
    ///
    /// # Errors
    ///
    /// Fails when the new state cannot be saved.
    pub fn dispatch(&mut self, action: StoreAction) -> StoreResult<()> {
        self.state = reduce(&self.state, action);
        self.persistence.save(&self.name, &self.state).inspect_err(|e| {
            tracing::error!(name = %self.name, error = %e, "Failed to persist conversation store");
        })
    }
}

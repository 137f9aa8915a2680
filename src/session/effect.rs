//! Effects produced by session transitions

use super::state::{Message, SessionStatus};

/// Something for the UI to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A fresh, empty session is bound
    Rebound { conversation_id: Option<String> },
    Status(SessionStatus),
    /// Streamed assistant text
    Delta { message_id: String, text: String },
    /// The response completed; the session is idle
    Done,
    /// The request failed; the session is idle and may be retried
    Failed { message: String },
}

/// Effects to be executed after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a request carrying the full transcript
    SendMessages {
        generation: u64,
        conversation_id: Option<String>,
        messages: Vec<Message>,
    },

    /// Abandon the request of this generation
    CancelRequest { generation: u64 },

    /// Title a conversation that still carries the placeholder title
    RenameConversation {
        conversation_id: String,
        title: String,
    },

    /// No conversation is active: create one and make it active
    CreateConversation,

    /// Notify the UI
    Notify(SessionUpdate),
}

impl Effect {
    #[must_use]
    pub fn notify_status(status: SessionStatus) -> Self {
        Effect::Notify(SessionUpdate::Status(status))
    }

    #[must_use]
    pub fn notify_done() -> Self {
        Effect::Notify(SessionUpdate::Done)
    }
}

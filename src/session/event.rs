//! Events that drive the session

use crate::input::Attachment;

/// Events that trigger session transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Binding
    /// The active conversation changed
    Rebind {
        conversation_id: Option<String>,
    },

    // User events
    Submit {
        message_id: String,
        text: String,
        attachments: Vec<Attachment>,
    },

    // Stream events, tagged with the generation of the request
    StreamStarted {
        generation: u64,
        message_id: String,
    },
    TextDelta {
        generation: u64,
        message_id: String,
        delta: String,
    },
    StreamFinished {
        generation: u64,
    },
    StreamFailed {
        generation: u64,
        message: String,
    },
}

impl Event {
    /// Generation a stream event belongs to
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        match self {
            Event::StreamStarted { generation, .. }
            | Event::TextDelta { generation, .. }
            | Event::StreamFinished { generation }
            | Event::StreamFailed { generation, .. } => Some(*generation),
            Event::Rebind { .. } | Event::Submit { .. } => None,
        }
    }
}

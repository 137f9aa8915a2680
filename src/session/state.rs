//! Live session types

use crate::input::Attachment;
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A fragment of message content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Part {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "mediaType")]
        media_type: String,
        data: String,
    },
}

impl From<Attachment> for Part {
    fn from(attachment: Attachment) -> Self {
        Part::File {
            media_type: attachment.media_type().to_string(),
            data: attachment.into_data(),
        }
    }
}

/// A chat message. Serializes in the relay's inbound wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    /// All text parts, concatenated
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                Part::File { .. } => None,
            })
            .collect()
    }

    /// Number of file parts
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, Part::File { .. }))
            .count()
    }

    /// Append streamed text to the trailing text part
    pub(crate) fn push_text(&mut self, delta: &str) {
        if let Some(Part::Text { text }) = self.parts.last_mut() {
            text.push_str(delta);
        } else {
            self.parts.push(Part::Text {
                text: delta.to_string(),
            });
        }
    }
}

/// Transfer status of the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// Request sent, no response content yet
    Submitted,
    /// Receiving response content
    Streaming,
}

impl SessionStatus {
    #[must_use]
    pub fn is_busy(self) -> bool {
        !matches!(self, SessionStatus::Idle)
    }
}

/// Live, unpersisted message exchange bound to one conversation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub conversation_id: Option<String>,
    /// Append-ordered transcript
    pub messages: Vec<Message>,
    pub status: SessionStatus,
    /// Identifies the current binding and request; stream events from any
    /// other generation are stale.
    pub generation: u64,
    /// Failure of the last request, cleared by the next submit
    pub last_error: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new(conversation_id: Option<String>, generation: u64) -> Self {
        Self {
            conversation_id,
            messages: Vec::new(),
            status: SessionStatus::Idle,
            generation,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_wire_shape() {
        let msg = Message {
            id: "m1".into(),
            role: Role::User,
            parts: vec![
                Part::Text { text: "hi".into() },
                Attachment::audio(b"RIFF").into(),
            ],
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "id": "m1",
                "role": "user",
                "parts": [
                    {"type": "text", "text": "hi"},
                    {"type": "file", "mediaType": "audio/wav", "data": "UklGRg=="}
                ]
            })
        );
    }

    #[test]
    fn test_push_text_extends_trailing_text() {
        let mut msg = Message {
            id: "a".into(),
            role: Role::Assistant,
            parts: vec![],
        };
        msg.push_text("Hel");
        msg.push_text("lo");
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.text(), "Hello");
    }

    #[test]
    fn test_text_skips_files() {
        let msg = Message {
            id: "m".into(),
            role: Role::User,
            parts: vec![
                Part::Text { text: "a".into() },
                Attachment::image(b"x").into(),
                Part::Text { text: "b".into() },
            ],
        };
        assert_eq!(msg.text(), "ab");
        assert_eq!(msg.file_count(), 1);
    }
}

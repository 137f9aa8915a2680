//! Conversation list state and its pure reducer

use crate::title::DEFAULT_TITLE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation with a fresh id and the given title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a conversation with the placeholder title
    #[must_use]
    pub fn untitled() -> Self {
        Self::new(DEFAULT_TITLE)
    }

    fn apply(&mut self, patch: &ConversationPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Partial update merged into an existing conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationPatch {
    /// Retitle and bump `updated_at` to now
    #[must_use]
    pub fn retitle(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            updated_at: Some(Utc::now()),
        }
    }
}

/// Everything the store persists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    /// Most recent first
    pub conversations: Vec<Conversation>,
    pub current_conversation_id: Option<String>,
}

impl StoreState {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn current(&self) -> Option<&Conversation> {
        self.current_conversation_id
            .as_deref()
            .and_then(|id| self.get(id))
    }
}

/// Store mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Point at a conversation (or nothing). The id is not validated.
    SetCurrent(Option<String>),
    /// Insert at the front and make it current
    Add(Conversation),
    /// Merge fields into the matching conversation
    Update {
        id: String,
        patch: ConversationPatch,
    },
    /// Remove; clears the current pointer if it pointed here
    Delete(String),
}

/// Pure reducer: old state + action -> new state.
///
/// Unknown ids in `Update` and `Delete` leave the state unchanged.
#[must_use]
pub fn reduce(state: &StoreState, action: StoreAction) -> StoreState {
    match action {
        StoreAction::SetCurrent(id) => StoreState {
            conversations: state.conversations.clone(),
            current_conversation_id: id,
        },
        StoreAction::Add(conversation) => {
            let current = Some(conversation.id.clone());
            let mut conversations = Vec::with_capacity(state.conversations.len() + 1);
            conversations.push(conversation);
            conversations.extend(state.conversations.iter().cloned());
            StoreState {
                conversations,
                current_conversation_id: current,
            }
        }
        StoreAction::Update { id, patch } => StoreState {
            conversations: state
                .conversations
                .iter()
                .map(|c| {
                    let mut c = c.clone();
                    if c.id == id {
                        c.apply(&patch);
                    }
                    c
                })
                .collect(),
            current_conversation_id: state.current_conversation_id.clone(),
        },
        StoreAction::Delete(id) => StoreState {
            conversations: state
                .conversations
                .iter()
                .filter(|c| c.id != id)
                .cloned()
                .collect(),
            current_conversation_id: state
                .current_conversation_id
                .clone()
                .filter(|current| *current != id),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(id: &str) -> Conversation {
        let mut c = Conversation::untitled();
        c.id = id.to_string();
        c
    }

    fn ids(state: &StoreState) -> Vec<&str> {
        state.conversations.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_add_prepends_and_activates() {
        let s = reduce(&StoreState::default(), StoreAction::Add(conv("a")));
        let s = reduce(&s, StoreAction::Add(conv("b")));
        assert_eq!(ids(&s), vec!["b", "a"]);
        assert_eq!(s.current_conversation_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_update_merges_only_given_fields() {
        let original = conv("a");
        let s = reduce(&StoreState::default(), StoreAction::Add(original.clone()));
        let s = reduce(
            &s,
            StoreAction::Update {
                id: "a".into(),
                patch: ConversationPatch {
                    title: Some("Renamed".into()),
                    updated_at: None,
                },
            },
        );
        let updated = s.get("a").unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.updated_at, original.updated_at);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let s = reduce(&StoreState::default(), StoreAction::Add(conv("a")));
        let after = reduce(
            &s,
            StoreAction::Update {
                id: "missing".into(),
                patch: ConversationPatch::retitle("x"),
            },
        );
        assert_eq!(after, s);
    }

    #[test]
    fn test_delete_active_clears_pointer_without_reselecting() {
        let s = reduce(&StoreState::default(), StoreAction::Add(conv("a")));
        let s = reduce(&s, StoreAction::Add(conv("b")));
        let s = reduce(&s, StoreAction::Delete("b".into()));
        assert_eq!(ids(&s), vec!["a"]);
        assert_eq!(s.current_conversation_id, None);
    }

    #[test]
    fn test_delete_inactive_keeps_pointer() {
        let s = reduce(&StoreState::default(), StoreAction::Add(conv("a")));
        let s = reduce(&s, StoreAction::Add(conv("b")));
        let s = reduce(&s, StoreAction::Delete("a".into()));
        assert_eq!(s.current_conversation_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_set_current_is_not_validated() {
        let s = reduce(
            &StoreState::default(),
            StoreAction::SetCurrent(Some("ghost".into())),
        );
        assert_eq!(s.current_conversation_id.as_deref(), Some("ghost"));
        assert!(s.current().is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let mut s = reduce(&StoreState::default(), StoreAction::Add(conv("a")));
        s.conversations[0].title = "Hello".into();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["currentConversationId"], "a");
        assert_eq!(json["conversations"][0]["title"], "Hello");
        assert!(json["conversations"][0]["createdAt"].is_string());
        assert!(json["conversations"][0]["updatedAt"].is_string());
    }
}

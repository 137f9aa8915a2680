//! Conversation title derivation
//!
//! Titles are taken from the first message of a new conversation.

/// Title given to a conversation before anything has been sent
pub const DEFAULT_TITLE: &str = "New conversation";

/// Maximum title length in characters, excluding the truncation marker
pub const MAX_TITLE_CHARS: usize = 30;

/// Appended when the source text was longer than [`MAX_TITLE_CHARS`]
pub const TRUNCATION_MARKER: &str = "...";

/// Derive a title from the first message text.
///
/// Returns None for blank text.
#[must_use]
pub fn derive_title(message_text: &str) -> Option<String> {
    let trimmed = message_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut chars = trimmed.chars();
    let mut title: String = chars.by_ref().take(MAX_TITLE_CHARS).collect();
    if chars.next().is_some() {
        title.push_str(TRUNCATION_MARKER);
    }
    Some(title)
}

/// Normalize a user-edited title. Blank edits are rejected.
#[must_use]
pub fn normalize_title(title: &str) -> Option<String> {
    let trimmed = title.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

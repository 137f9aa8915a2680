//! Pure session transition function
//!
//! Given the same session and event this always yields the same result; all
//! I/O is expressed as [`Effect`]s for the controller to run.

use super::effect::SessionUpdate;
use super::state::{Message, Part, Role, Session, SessionStatus};
use super::{Effect, Event};
use crate::title::derive_title;
use thiserror::Error;

/// Result of a session transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: Session) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the session refuses. The session is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A response is still in progress")]
    Busy,
    #[error("Nothing to send")]
    EmptyMessage,
    #[error("Event from a superseded request")]
    StaleEvent,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// # Errors
///
/// Returns a [`TransitionError`] when the event is not valid in the current state. The state is
/// left unchanged.
pub fn transition(state: &Session, event: Event) -> Result<TransitionResult, TransitionError> {
    if let Some(generation) = event.generation() {
        if generation != state.generation {
            return Err(TransitionError::StaleEvent);
        }
    }

    match (state.status, event) {
        // ============================================================
        // Binding
        // ============================================================

        // Any + Rebind -> fresh Idle session; the old request is abandoned
        (status, Event::Rebind { conversation_id }) => {
            let needs_conversation = conversation_id.is_none();
            let cancel = status
                .is_busy()
                .then_some(Effect::CancelRequest {
                    generation: state.generation,
                });
            let create = needs_conversation.then_some(Effect::CreateConversation);

            Ok(
                TransitionResult::new(Session::new(conversation_id.clone(), state.generation + 1))
                    .with_effects(cancel)
                    .with_effect(Effect::Notify(SessionUpdate::Rebound { conversation_id }))
                    .with_effects(create),
            )
        }

        // ============================================================
        // Submission
        // ============================================================

        (SessionStatus::Submitted | SessionStatus::Streaming, Event::Submit { .. }) => {
            Err(TransitionError::Busy)
        }

        (
            SessionStatus::Idle,
            Event::Submit {
                message_id,
                text,
                attachments,
            },
        ) => {
            let has_text = !text.trim().is_empty();
            if !has_text && attachments.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            // Title comes from the first message of a bound conversation
            let rename = if state.messages.is_empty() {
                state
                    .conversation_id
                    .clone()
                    .zip(derive_title(&text))
                    .map(|(conversation_id, title)| Effect::RenameConversation {
                        conversation_id,
                        title,
                    })
            } else {
                None
            };

            let mut parts = Vec::with_capacity(attachments.len() + 1);
            if has_text {
                parts.push(Part::Text { text });
            }
            parts.extend(attachments.into_iter().map(Part::from));

            let mut messages = state.messages.clone();
            messages.push(Message {
                id: message_id,
                role: Role::User,
                parts,
            });

            let generation = state.generation + 1;
            let new_state = Session {
                conversation_id: state.conversation_id.clone(),
                messages: messages.clone(),
                status: SessionStatus::Submitted,
                generation,
                last_error: None,
            };

            Ok(TransitionResult::new(new_state)
                .with_effects(rename)
                .with_effect(Effect::SendMessages {
                    generation,
                    conversation_id: state.conversation_id.clone(),
                    messages,
                })
                .with_effect(Effect::notify_status(SessionStatus::Submitted)))
        }

        // ============================================================
        // Streaming
        // ============================================================

        // Submitted + StreamStarted -> Streaming with an empty assistant message
        (SessionStatus::Submitted, Event::StreamStarted { message_id, .. }) => {
            let mut new_state = state.clone();
            new_state.messages.push(Message {
                id: message_id,
                role: Role::Assistant,
                parts: vec![],
            });
            new_state.status = SessionStatus::Streaming;
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::notify_status(SessionStatus::Streaming)))
        }

        // Streaming + StreamStarted -> already have the assistant message
        (SessionStatus::Streaming, Event::StreamStarted { .. }) => {
            Ok(TransitionResult::new(state.clone()))
        }

        // Submitted/Streaming + TextDelta -> append to the assistant message
        (
            status @ (SessionStatus::Submitted | SessionStatus::Streaming),
            Event::TextDelta {
                message_id, delta, ..
            },
        ) => {
            let mut new_state = state.clone();
            let append = status == SessionStatus::Streaming
                && new_state
                    .messages
                    .last()
                    .is_some_and(|m| m.role == Role::Assistant);
            if append {
                if let Some(last) = new_state.messages.last_mut() {
                    last.push_text(&delta);
                }
            } else {
                new_state.messages.push(Message {
                    id: message_id.clone(),
                    role: Role::Assistant,
                    parts: vec![Part::Text {
                        text: delta.clone(),
                    }],
                });
            }
            new_state.status = SessionStatus::Streaming;

            let first_chunk = (status == SessionStatus::Submitted)
                .then_some(Effect::notify_status(SessionStatus::Streaming));
            Ok(TransitionResult::new(new_state)
                .with_effects(first_chunk)
                .with_effect(Effect::Notify(SessionUpdate::Delta {
                    message_id,
                    text: delta,
                })))
        }

        // Submitted/Streaming + StreamFinished -> Idle
        (SessionStatus::Submitted | SessionStatus::Streaming, Event::StreamFinished { .. }) => {
            let mut new_state = state.clone();
            new_state.status = SessionStatus::Idle;
            Ok(TransitionResult::new(new_state).with_effect(Effect::notify_done()))
        }

        // Submitted/Streaming + StreamFailed -> Idle, transcript kept
        (SessionStatus::Submitted | SessionStatus::Streaming, Event::StreamFailed { message, .. }) => {
            let mut new_state = state.clone();
            new_state.status = SessionStatus::Idle;
            new_state.last_error = Some(message.clone());
            Ok(TransitionResult::new(new_state)
                .with_effect(Effect::Notify(SessionUpdate::Failed { message })))
        }

        (SessionStatus::Idle, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while idle"
        ))),
    }
}

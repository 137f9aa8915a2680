//! Session controller
//!
//! Owns the conversation store, the transport and the one live session.
//! Runs the effects produced by [`transition`] and feeds stream events back
//! into it.

use super::effect::{Effect, SessionUpdate};
use super::state::{Message, Session, SessionStatus};
use super::stream::StreamPart;
use super::transition::{transition, TransitionError};
use super::transport::{ChatTransport, OutboundChat};
use super::Event;
use crate::input::Attachment;
use crate::store::{
    Conversation, ConversationPatch, ConversationStore, StatePersistence, StoreError, StoreResult,
};
use crate::title::{normalize_title, DEFAULT_TITLE};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Failed to save conversations: {0}")]
    Store(#[from] StoreError),
}

/// The request currently streaming into the session
struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

pub struct SessionController<T: ChatTransport + 'static, P: StatePersistence> {
    store: ConversationStore<P>,
    transport: Arc<T>,
    session: Session,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    in_flight: Option<InFlight>,
    updates: VecDeque<SessionUpdate>,
}

impl<T: ChatTransport + 'static, P: StatePersistence> SessionController<T, P> {
    /// Bind a session to the store's active conversation, creating one if
    /// there is none.
    ///
    /// # Errors
    ///
    /// Fails when a conversation has to be created and the store cannot save it.
    pub fn new(store: ConversationStore<P>, transport: Arc<T>) -> Result<Self, ControllerError> {
        let (event_tx, event_rx) = mpsc::channel(64);
        let current = store.current_conversation_id().map(String::from);
        let mut controller = Self {
            store,
            transport,
            session: Session::default(),
            event_tx,
            event_rx,
            in_flight: None,
            updates: VecDeque::new(),
        };
        controller.apply(Event::Rebind {
            conversation_id: current,
        })?;
        Ok(controller)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.session.messages
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore<P> {
        &self.store
    }

    /// Send a message. Blank text without attachments, or a submit while a
    /// response is in progress, is rejected and leaves the session as is.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Rejected`] when the submit is refused; [`ControllerError::Store`]
    /// when a title could not be saved.
    pub fn submit(&mut self, text: &str, attachments: Vec<Attachment>) -> Result<(), ControllerError> {
        self.apply(Event::Submit {
            message_id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            attachments,
        })
    }

    /// Create an untitled conversation and make it active
    ///
    /// # Errors
    ///
    /// Fails when the store cannot save. The conversation stays in memory and active.
    pub fn new_conversation(&mut self) -> Result<String, ControllerError> {
        let conversation = Conversation::untitled();
        let id = conversation.id.clone();
        let saved = self.store.add_conversation(conversation);
        self.after_store_change(saved)?;
        Ok(id)
    }

    /// Make a conversation active and bind a fresh session to it
    ///
    /// # Errors
    ///
    /// Fails when the store cannot save the new active pointer.
    pub fn switch_conversation(&mut self, id: &str) -> Result<(), ControllerError> {
        let saved = self.store.set_current_conversation(Some(id.to_string()));
        self.after_store_change(saved)
    }

    /// Rename a conversation. Returns false when the title is blank.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot save.
    pub fn rename_conversation(&mut self, id: &str, title: &str) -> Result<bool, ControllerError> {
        let Some(title) = normalize_title(title) else {
            return Ok(false);
        };
        self.store
            .update_conversation(id, ConversationPatch::retitle(title))?;
        Ok(true)
    }

    /// Delete a conversation, rebinding if it was the active one
    ///
    /// # Errors
    ///
    /// Fails when the store cannot save.
    pub fn delete_conversation(&mut self, id: &str) -> Result<(), ControllerError> {
        let saved = self.store.delete_conversation(id);
        self.after_store_change(saved)
    }

    /// Next thing to render. Applies stream events as they arrive; waits
    /// while there is nothing to report.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            if let Some(update) = self.updates.pop_front() {
                return Some(update);
            }
            let event = self.event_rx.recv().await?;
            match self.apply(event) {
                Ok(()) => {}
                Err(ControllerError::Rejected(TransitionError::StaleEvent)) => {
                    tracing::debug!("Dropped event from an abandoned request");
                }
                Err(e) => tracing::warn!(error = %e, "Failed to apply stream event"),
            }
        }
    }

    /// Rebind after the active pointer may have moved, then report the
    /// store result.
    fn after_store_change(&mut self, saved: StoreResult<()>) -> Result<(), ControllerError> {
        let synced = self.sync_binding();
        saved?;
        synced
    }

    fn sync_binding(&mut self) -> Result<(), ControllerError> {
        let current = self.store.current_conversation_id();
        if current == self.session.conversation_id.as_deref() {
            return Ok(());
        }
        let conversation_id = current.map(String::from);
        self.apply(Event::Rebind { conversation_id })
    }

    /// Run an event and everything it triggers. A rejected event changes
    /// nothing; otherwise all effects run and the first failure is returned.
    fn apply(&mut self, event: Event) -> Result<(), ControllerError> {
        let mut pending = VecDeque::from([event]);
        let mut first_error = None;

        while let Some(event) = pending.pop_front() {
            let result = transition(&self.session, event)?;
            self.session = result.new_state;

            for effect in result.effects {
                if let Err(e) = self.execute_effect(effect, &mut pending) {
                    tracing::error!(error = %e, "Effect failed");
                    first_error.get_or_insert(e);
                }
            }

            let finished = !self.session.status.is_busy()
                && self
                    .in_flight
                    .as_ref()
                    .is_some_and(|f| f.generation == self.session.generation);
            if finished {
                self.in_flight = None;
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn execute_effect(
        &mut self,
        effect: Effect,
        pending: &mut VecDeque<Event>,
    ) -> Result<(), ControllerError> {
        match effect {
            Effect::SendMessages {
                generation,
                conversation_id,
                messages,
            } => {
                self.start_request(
                    generation,
                    OutboundChat {
                        messages,
                        conversation_id,
                    },
                );
                Ok(())
            }

            Effect::CancelRequest { generation } => {
                if let Some(in_flight) = self.in_flight.take() {
                    tracing::info!(
                        generation,
                        in_flight = in_flight.generation,
                        "Abandoning in-flight request"
                    );
                    in_flight.cancel.cancel();
                }
                Ok(())
            }

            Effect::RenameConversation {
                conversation_id,
                title,
            } => {
                // Only placeholder titles are replaced; derived and user-edited ones stay
                let untitled = self
                    .store
                    .get(&conversation_id)
                    .is_some_and(|c| c.title == DEFAULT_TITLE);
                if !untitled {
                    tracing::debug!(%conversation_id, "Conversation already titled");
                    return Ok(());
                }
                tracing::debug!(%conversation_id, %title, "Titling conversation");
                self.store
                    .update_conversation(&conversation_id, ConversationPatch::retitle(title))?;
                Ok(())
            }

            Effect::CreateConversation => {
                let conversation = Conversation::untitled();
                let conversation_id = Some(conversation.id.clone());
                let saved = self.store.add_conversation(conversation);
                pending.push_back(Event::Rebind { conversation_id });
                saved?;
                Ok(())
            }

            Effect::Notify(update) => {
                self.updates.push_back(update);
                Ok(())
            }
        }
    }

    fn start_request(&mut self, generation: u64, chat: OutboundChat) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.in_flight.replace(InFlight {
            generation,
            cancel: cancel.clone(),
        }) {
            previous.cancel.cancel();
        }

        let transport = self.transport.clone();
        let event_tx = self.event_tx.clone();
        tracing::info!(
            generation,
            conversation_id = ?chat.conversation_id,
            messages = chat.messages.len(),
            "Sending chat request"
        );

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(generation, "Chat request cancelled");
                }
                () = pump(transport.as_ref(), &chat, generation, &event_tx) => {}
            }
        });
    }
}

impl<T: ChatTransport + 'static, P: StatePersistence> Drop for SessionController<T, P> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
    }
}

/// Forward one response as session events. A body that ends without a
/// finish part counts as complete.
async fn pump<T: ChatTransport + ?Sized>(
    transport: &T,
    chat: &OutboundChat,
    generation: u64,
    event_tx: &mpsc::Sender<Event>,
) {
    let mut parts = match transport.send(chat).await {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(generation, error = %e, "Chat request failed");
            let _ = event_tx
                .send(Event::StreamFailed {
                    generation,
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };

    let mut message_id: Option<String> = None;
    while let Some(part) = parts.next().await {
        let event = match part {
            Ok(StreamPart::Start { message_id: id }) => {
                let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                message_id = Some(id.clone());
                Event::StreamStarted {
                    generation,
                    message_id: id,
                }
            }
            Ok(StreamPart::TextDelta { delta, .. }) => Event::TextDelta {
                generation,
                message_id: message_id
                    .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                    .clone(),
                delta,
            },
            Ok(StreamPart::Finish { .. }) => break,
            Ok(StreamPart::Error { error }) => Event::StreamFailed {
                generation,
                message: error,
            },
            Ok(_) => continue,
            Err(e) => Event::StreamFailed {
                generation,
                message: e.to_string(),
            },
        };

        let failed = matches!(event, Event::StreamFailed { .. });
        if event_tx.send(event).await.is_err() || failed {
            return;
        }
    }

    let _ = event_tx.send(Event::StreamFinished { generation }).await;
}

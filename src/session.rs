//! Live chat session
//!
//! The session is a pure state machine: `transition(state, event)` returns
//! the new state plus effects. [`SessionController`] executes those effects
//! against the conversation store and the relay transport.

mod controller;
mod effect;
mod event;
mod state;
mod stream;
mod transition;
mod transport;

#[cfg(test)]
mod proptests;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ControllerError, SessionController};
pub use effect::{Effect, SessionUpdate};
pub use event::Event;
pub use state::{Message, Part, Role, Session, SessionStatus};
pub use stream::{decode_stream, SseDecoder, StreamPart};
pub use transition::{transition, TransitionError, TransitionResult};
pub use transport::{ChatTransport, HttpTransport, OutboundChat, PartStream, TransportError};

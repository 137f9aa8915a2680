//! ADK Chat - streaming chat relay and conversation session core
//!
//! The relay forwards a signed-in user's messages to the upstream ADK
//! service and streams the answer back. The client side keeps a persisted
//! list of conversations and a live, in-memory session bound to the active
//! one.

pub mod api;
pub mod config;
pub mod input;
pub mod session;
pub mod store;
pub mod title;
pub mod upstream;

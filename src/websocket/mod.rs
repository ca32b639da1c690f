//! WebSocket module for the note relay
//!
//! This module tracks open connections, routes note events between them,
//! and runs the per-connection session actors.

mod event;
mod registry;
mod relay;
mod session;

pub use event::{Event, NOTE_EVENT};
pub use registry::{ConnectionHandle, ConnectionRegistry, Outbox};
pub use relay::BroadcastRelay;
pub use session::RelaySession;

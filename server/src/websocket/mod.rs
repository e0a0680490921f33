//! WebSocket support for change notifications.
//!
//! Clients connect via WebSocket and receive a `markers_changed` message
//! every time a sync cycle commits, instead of polling `/markers`.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;

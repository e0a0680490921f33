//! Sync orchestration.
//!
//! [`SyncService`] owns the cycle; [`spawn_scheduler`] drives it on a timer.
//! Manual triggers come from `POST /sync` and WebSocket `sync` messages.

mod report;
mod scheduler;
mod service;

pub use report::*;
pub use scheduler::spawn_scheduler;
pub use service::SyncService;

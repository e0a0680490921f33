//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded, tagged by `type`, and use snake_case for
//! field names.

use markersync_engine::ChangeNotification;
use serde::{Deserialize, Serialize};

use crate::sync::SyncReport;

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for an immediate sync cycle.
    Sync {
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The cache committed a batch. Sent to every connection, once per batch.
    MarkersChanged {
        inserted: usize,
        updated: usize,
        deleted: usize,
    },

    /// Result of a client-requested sync.
    SyncResult {
        report: SyncReport,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }
}

impl From<ChangeNotification> for ServerMessage {
    fn from(change: ChangeNotification) -> Self {
        ServerMessage::MarkersChanged {
            inserted: change.inserted,
            updated: change.updated,
            deleted: change.deleted,
        }
    }
}

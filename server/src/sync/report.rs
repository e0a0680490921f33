//! Per-cycle bookkeeping.

use chrono::{DateTime, Utc};
use markersync_engine::SyncStats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What started a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// First cycle after the daemon starts
    Startup,
    /// Periodic timer
    Scheduled,
    /// `POST /sync`
    Manual,
    /// A WebSocket client's `sync` message
    #[serde(rename = "websocket")]
    WebSocket,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Manual => "manual",
            SyncTrigger::WebSocket => "websocket",
        };
        f.write_str(name)
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Succeeded,
    Failed,
}

/// Record of one finished cycle, served by `GET /sync/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub stats: SyncStats,
    /// Mutations committed (zero on failure)
    pub applied: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    /// Check if the cycle committed.
    pub fn succeeded(&self) -> bool {
        self.outcome == CycleOutcome::Succeeded
    }

    /// Wall-clock duration of the cycle.
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

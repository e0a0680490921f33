//! Snapshot types for persisting and restoring a marker cache.
//!
//! Snapshots let a host persist a [`MemoryStore`](crate::MemoryStore)
//! between runs. Serialization is deterministic.

use crate::{error::Result, Error, LocalEntry, RowId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time copy of a marker cache.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Row id the store hands out next
    pub next_row_id: RowId,
    /// Cached rows keyed by row id
    pub entries: BTreeMap<RowId, LocalEntry>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            next_row_id: 1,
            entries: BTreeMap::new(),
        }
    }

    /// Add a row, bumping `next_row_id` past it if needed.
    pub fn add_entry(&mut self, entry: LocalEntry) {
        if entry.row_id >= self.next_row_id {
            self.next_row_id = entry.row_id + 1;
        }
        self.entries.insert(entry.row_id, entry);
    }

    /// Number of rows.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Check internal consistency before the snapshot is loaded into a store.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for (key, entry) in &self.entries {
            if *key != entry.row_id {
                return Err(Error::InvalidSnapshot(format!(
                    "row keyed as {} carries row id {}",
                    key, entry.row_id
                )));
            }
            if *key >= self.next_row_id {
                return Err(Error::InvalidSnapshot(format!(
                    "row id {} is not below next row id {}",
                    key, self.next_row_id
                )));
            }
            if let Some(id) = &entry.external_id {
                if !seen.insert(id.as_str()) {
                    return Err(Error::InvalidSnapshot(format!(
                        "external id {} cached twice",
                        id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

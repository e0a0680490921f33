//! Reconciliation of the remote feed against the local cache.
//!
//! Given the decoded feed and a snapshot of the cached rows, this module
//! computes the batch of inserts, updates and deletes that makes the cache
//! mirror the feed. It is a pure function of its inputs: no IO, no state kept
//! between passes.
//!
//! # Algorithm
//!
//! 1. Index remote entries by external id (last occurrence wins)
//! 2. Walk the local rows in the order given:
//!    - matched id: schedule an update if any compared field differs,
//!      then consume the id
//!    - unmatched: schedule a delete
//! 3. Schedule an insert for every remote entry left unconsumed
//!
//! Entries without an external id never match; what happens to them is
//! decided by the [`AbsentIdPolicy`].

use crate::sync::SyncStats;
use crate::{ExternalId, LocalEntry, RemoteEntry, RowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// What to do with remote entries that carry no external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AbsentIdPolicy {
    /// Insert the entry on every pass (default)
    #[default]
    Insert,
    /// Drop the entry and count it as skipped
    Reject,
}

impl fmt::Display for AbsentIdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbsentIdPolicy::Insert => f.write_str("insert"),
            AbsentIdPolicy::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for AbsentIdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(AbsentIdPolicy::Insert),
            "reject" => Ok(AbsentIdPolicy::Reject),
            other => Err(format!("unknown absent id policy: {}", other)),
        }
    }
}

/// An update scheduled against an existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUpdate {
    /// Row to overwrite
    pub row_id: RowId,
    /// Remote values to write
    pub entry: RemoteEntry,
}

/// The batch of mutations computed by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    /// Remote entries with no local counterpart
    pub inserts: Vec<RemoteEntry>,
    /// Local rows whose remote counterpart changed
    pub updates: Vec<PlannedUpdate>,
    /// Local rows with no remote counterpart
    pub deletes: Vec<RowId>,
    /// Number of local rows examined
    pub entries_seen: usize,
    /// Remote entries dropped by [`AbsentIdPolicy::Reject`]
    pub skipped: usize,
}

impl ReconciliationPlan {
    /// Total number of mutations in the plan.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    /// True when applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters describing this plan.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            entries_seen: self.entries_seen,
            inserted: self.inserts.len(),
            updated: self.updates.len(),
            deleted: self.deletes.len(),
            parse_errors: 0,
            skipped: self.skipped,
        }
    }
}

/// Computes reconciliation plans.
///
/// Holds only configuration, so it is `Copy` and can be created per cycle or
/// shared freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciler {
    policy: AbsentIdPolicy,
}

impl Reconciler {
    /// Create a reconciler with the given absent-id policy.
    pub fn new(policy: AbsentIdPolicy) -> Self {
        Self { policy }
    }

    /// The configured absent-id policy.
    pub fn policy(&self) -> AbsentIdPolicy {
        self.policy
    }

    /// Diff the remote feed against the local snapshot.
    pub fn reconcile(&self, remote: Vec<RemoteEntry>, local: &[LocalEntry]) -> ReconciliationPlan {
        let mut plan = ReconciliationPlan::default();

        // Slots keep feed order; a duplicate id empties the earlier slot.
        let mut slots: Vec<Option<RemoteEntry>> = Vec::with_capacity(remote.len());
        let mut by_id: HashMap<ExternalId, usize> = HashMap::with_capacity(remote.len());

        for entry in remote {
            match &entry.id {
                Some(id) => {
                    if let Some(previous) = by_id.insert(id.clone(), slots.len()) {
                        slots[previous] = None;
                    }
                    slots.push(Some(entry));
                }
                None => match self.policy {
                    AbsentIdPolicy::Insert => slots.push(Some(entry)),
                    AbsentIdPolicy::Reject => plan.skipped += 1,
                },
            }
        }

        for row in local {
            plan.entries_seen += 1;

            let matched = row
                .external_id
                .as_ref()
                .and_then(|id| by_id.remove(id))
                .and_then(|index| slots[index].take());

            match matched {
                Some(entry) => {
                    if entry.differs_from(row) {
                        plan.updates.push(PlannedUpdate {
                            row_id: row.row_id,
                            entry,
                        });
                    }
                }
                None => plan.deletes.push(row.row_id),
            }
        }

        plan.inserts = slots.into_iter().flatten().collect();
        plan
    }
}

/// Reconcile with the default [`AbsentIdPolicy::Insert`] policy.
pub fn reconcile(remote: Vec<RemoteEntry>, local: &[LocalEntry]) -> ReconciliationPlan {
    Reconciler::default().reconcile(remote, local)
}

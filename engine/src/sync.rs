//! One full sync cycle over an in-hand feed.
//!
//! [`synchronize`] decodes the feed, reconciles it against the store's
//! snapshot and applies the plan as a single batch. Transport is the host's
//! job; this is everything that happens after the bytes arrive.

use crate::{decode_feed_slice, Error, LocalStore, Reconciler};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counters for one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Local rows examined
    pub entries_seen: usize,
    /// Rows inserted
    pub inserted: usize,
    /// Rows updated
    pub updated: usize,
    /// Rows deleted
    pub deleted: usize,
    /// Feed documents that failed to decode (0 or 1)
    pub parse_errors: usize,
    /// Remote entries dropped for lack of an external id
    pub skipped: usize,
}

impl SyncStats {
    /// Inserted + updated + deleted.
    pub fn total_changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// A completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// What the cycle did
    pub stats: SyncStats,
    /// Mutations the store reported as applied
    pub applied: usize,
}

/// A failed cycle. The store is unchanged.
///
/// `stats` holds whatever was known when the cycle stopped: a decode
/// failure has `parse_errors == 1`, an apply failure the counts of the
/// plan that was rolled back.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("sync failed: {error}")]
pub struct SyncFailure {
    /// Counters reached before the cycle stopped
    pub stats: SyncStats,
    /// Why the cycle stopped
    #[source]
    pub error: Error,
}

/// Run one cycle against `store`.
pub fn synchronize<S: LocalStore + ?Sized>(
    store: &mut S,
    feed: &[u8],
    reconciler: &Reconciler,
) -> Result<SyncOutcome, SyncFailure> {
    let remote = decode_feed_slice(feed).map_err(|error| SyncFailure {
        stats: SyncStats {
            parse_errors: 1,
            ..Default::default()
        },
        error,
    })?;

    let local = store.snapshot().map_err(|error| SyncFailure {
        stats: SyncStats::default(),
        error,
    })?;

    let plan = reconciler.reconcile(remote, &local);
    let stats = plan.stats();

    let applied = store
        .apply_batch(&plan)
        .map_err(|error| SyncFailure { stats, error })?;

    Ok(SyncOutcome { stats, applied })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbsentIdPolicy, ChangeNotification, MemoryStore};

    const FEED: &[u8] = br#"{"markers": [
        {"_id": "a", "name": "Harbour", "lat": 1.0, "lng": 2.0},
        {"_id": "b", "name": "Tower", "lat": 3.0, "lng": 4.0}
    ]}"#;

    #[test]
    fn first_sync_populates_store() {
        let mut store = MemoryStore::new();
        let outcome = synchronize(&mut store, FEED, &Reconciler::default()).unwrap();

        assert_eq!(outcome.stats.inserted, 2);
        assert_eq!(outcome.stats.entries_seen, 0);
        assert_eq!(outcome.applied, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn resync_is_a_no_op() {
        let mut store = MemoryStore::new();
        synchronize(&mut store, FEED, &Reconciler::default()).unwrap();

        let rx = store.subscribe();
        let outcome = synchronize(&mut store, FEED, &Reconciler::default()).unwrap();

        assert_eq!(outcome.stats.total_changes(), 0);
        assert_eq!(outcome.stats.entries_seen, 2);
        // An empty batch is still announced.
        assert_eq!(rx.try_recv().unwrap(), ChangeNotification::default());
    }

    #[test]
    fn feed_changes_flow_through() {
        let mut store = MemoryStore::new();
        synchronize(&mut store, FEED, &Reconciler::default()).unwrap();

        let next = br#"{"markers": [
            {"_id": "b", "name": "Tower", "lat": 3.5, "lng": 4.0},
            {"_id": "c", "lat": 5.0, "lng": 6.0}
        ]}"#;
        let outcome = synchronize(&mut store, next, &Reconciler::default()).unwrap();

        assert_eq!(
            (
                outcome.stats.inserted,
                outcome.stats.updated,
                outcome.stats.deleted
            ),
            (1, 1, 1)
        );
        let b = store.find_by_external_id("b").unwrap().unwrap();
        assert_eq!(b.lat, 3.5);
        assert!(store.find_by_external_id("a").unwrap().is_none());
    }

    #[test]
    fn malformed_feed_leaves_store_untouched() {
        let mut store = MemoryStore::new();
        synchronize(&mut store, FEED, &Reconciler::default()).unwrap();
        let before = store.snapshot().unwrap();
        let rx = store.subscribe();

        let failure = synchronize(&mut store, b"{\"markers\": [", &Reconciler::default())
            .unwrap_err();

        assert_eq!(failure.stats.parse_errors, 1);
        assert!(matches!(failure.error, Error::Decode(_)));
        assert_eq!(store.snapshot().unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn reject_policy_counts_skipped() {
        let mut store = MemoryStore::new();
        let feed = br#"{"markers": [{"name": "anonymous"}, {"_id": "a"}]}"#;
        let reconciler = Reconciler::new(AbsentIdPolicy::Reject);

        let outcome = synchronize(&mut store, feed, &reconciler).unwrap();
        assert_eq!(outcome.stats.skipped, 1);
        assert_eq!(outcome.stats.inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn failure_display() {
        let failure = SyncFailure {
            stats: SyncStats::default(),
            error: Error::RowNotFound(3),
        };
        assert_eq!(failure.to_string(), "sync failed: row not found: 3");
    }
}

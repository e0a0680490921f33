//! # markersync engine
//!
//! Keeps a local cache of geographic markers in step with a remote JSON feed.
//!
//! The crate holds the pure parts of a sync cycle: decoding the feed,
//! diffing it against the cached rows, and applying the resulting batch to a
//! store. Fetching the feed and persisting to disk are left to the host
//! (the `markersync-server` daemon or a mobile app through [`ffi`]).
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches the network or the filesystem
//! - **Deterministic**: the same feed and snapshot always give the same plan
//! - **Stateless reconciliation**: a [`Reconciler`] is a `Copy` value
//!
//! ## Core Concepts
//!
//! ### Entries
//!
//! - [`RemoteEntry`] - a marker as delivered by the feed, keyed by external id
//! - [`LocalEntry`] - a cached row, keyed by a storage-assigned row id
//!
//! ### Reconciliation
//!
//! [`Reconciler::reconcile`] turns (feed, snapshot) into a
//! [`ReconciliationPlan`] of inserts, updates and deletes. Entries without an
//! external id are handled according to [`AbsentIdPolicy`].
//!
//! ### Stores
//!
//! [`LocalStore`] is the seam to persistence. [`MemoryStore`] applies a plan
//! atomically and notifies subscribers once per batch.
//!
//! ## Quick Start
//!
//! ```rust
//! use markersync_engine::{synchronize, LocalStore, MemoryStore, Reconciler};
//!
//! let mut store = MemoryStore::new();
//! let feed = br#"{"markers": [
//!     {"_id": "a1", "name": "Harbour", "lat": 53.54, "lng": 9.98}
//! ]}"#;
//!
//! let outcome = synchronize(&mut store, feed, &Reconciler::default()).unwrap();
//! assert_eq!(outcome.stats.inserted, 1);
//!
//! // A second pass over the same feed changes nothing.
//! let outcome = synchronize(&mut store, feed, &Reconciler::default()).unwrap();
//! assert_eq!(outcome.stats.total_changes(), 0);
//! assert_eq!(store.snapshot().unwrap().len(), 1);
//! ```

pub mod entry;
pub mod error;
pub mod feed;
pub mod ffi;
pub mod reconcile;
pub mod snapshot;
pub mod store;
pub mod sync;

// Re-export main types at crate root
pub use entry::{LocalEntry, RemoteEntry};
pub use error::Error;
pub use feed::{decode_feed, decode_feed_slice};
pub use reconcile::{reconcile, AbsentIdPolicy, PlannedUpdate, ReconciliationPlan, Reconciler};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::{ChangeNotification, LocalStore, MarkerFilter, MemoryStore};
pub use sync::{synchronize, SyncFailure, SyncOutcome, SyncStats};

/// Storage-assigned primary key of a cached row.
pub type RowId = i64;
/// Identifier assigned by the remote feed.
pub type ExternalId = String;

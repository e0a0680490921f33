//! Error types for the markersync engine.

use crate::{ExternalId, RowId};
use thiserror::Error;

/// All possible errors from the engine.
///
/// Reconciliation itself never fails; these come from decoding the feed and
/// from applying a plan to a store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed feed: {0}")]
    Decode(String),

    // Store errors
    #[error("row not found: {0}")]
    RowNotFound(RowId),

    #[error("external id already cached: {0}")]
    DuplicateExternalId(ExternalId),

    #[error("batch rolled back after {applied} operations: {source}")]
    Apply { applied: usize, source: Box<Error> },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl Error {
    /// Wrap a store error raised part-way through a batch.
    pub fn apply(applied: usize, source: Error) -> Self {
        Error::Apply {
            applied,
            source: Box::new(source),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Marker entries as seen by the feed and by the local cache.

use crate::{ExternalId, RowId};
use serde::{Deserialize, Serialize};

/// A marker as delivered by the remote feed.
///
/// Produced fresh by the decoder on every sync cycle and never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    /// Stable identifier assigned by the feed (join key)
    pub id: Option<ExternalId>,
    /// Display name
    pub name: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl RemoteEntry {
    /// Create a remote entry with the given id and coordinates.
    pub fn new(id: impl Into<ExternalId>, lat: f64, lng: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
            address: None,
            lat,
            lng,
        }
    }

    /// Create a remote entry without an external id.
    pub fn without_id(lat: f64, lng: f64) -> Self {
        Self {
            id: None,
            name: None,
            address: None,
            lat,
            lng,
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Check whether applying this entry to `local` would change anything.
    ///
    /// An absent remote name or address never counts as a difference.
    /// Coordinates use exact equality.
    pub fn differs_from(&self, local: &LocalEntry) -> bool {
        text_differs(self.name.as_deref(), local.name.as_deref())
            || text_differs(self.address.as_deref(), local.address.as_deref())
            || self.lat != local.lat
            || self.lng != local.lng
    }
}

fn text_differs(remote: Option<&str>, local: Option<&str>) -> bool {
    match remote {
        Some(value) => local != Some(value),
        None => false,
    }
}

/// A marker row in the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalEntry {
    /// Storage-assigned primary key
    pub row_id: RowId,
    /// Feed identifier this row mirrors, absent for rows inserted from id-less entries
    pub external_id: Option<ExternalId>,
    /// Display name
    pub name: Option<String>,
    /// Postal address
    pub address: Option<String>,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

impl LocalEntry {
    /// Materialize a freshly inserted row from a remote entry.
    pub fn from_remote(row_id: RowId, entry: &RemoteEntry) -> Self {
        Self {
            row_id,
            external_id: entry.id.clone(),
            name: entry.name.clone(),
            address: entry.address.clone(),
            lat: entry.lat,
            lng: entry.lng,
        }
    }

    /// Overwrite this row with a remote entry.
    ///
    /// Coordinates are always replaced; an absent remote name or address keeps
    /// the stored value.
    pub fn apply_remote(&mut self, entry: &RemoteEntry) {
        if let Some(name) = &entry.name {
            self.name = Some(name.clone());
        }
        if let Some(address) = &entry.address {
            self.address = Some(address.clone());
        }
        self.lat = entry.lat;
        self.lng = entry.lng;
    }
}

//! Decoding of the upstream marker feed.
//!
//! The feed is a JSON object with a `markers` array:
//!
//! ```json
//! {"markers": [{"_id": "a1", "name": "Harbour", "address": "Pier 1", "lat": 53.5, "lng": 9.9}]}
//! ```
//!
//! Unknown fields are ignored at every level. A document without a `markers`
//! key decodes to an empty feed, and missing coordinates default to zero.
//! Ids may be sent as strings or numbers; coordinates as numbers or numeric
//! strings.

use crate::error::{Error, Result};
use crate::RemoteEntry;
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Deserialize)]
struct FeedDocument {
    #[serde(default)]
    markers: Vec<FeedMarker>,
}

#[derive(Deserialize)]
struct FeedMarker {
    #[serde(rename = "_id", default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    lat: f64,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    lng: f64,
}

impl From<FeedMarker> for RemoteEntry {
    fn from(marker: FeedMarker) -> Self {
        RemoteEntry {
            id: marker.id,
            name: marker.name,
            address: marker.address,
            lat: marker.lat,
            lng: marker.lng,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Number(n) => n.to_string(),
        Scalar::Text(s) => s,
    }))
}

fn lenient_coordinate<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("coordinate out of range")),
        Scalar::Text(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid coordinate: {}", s))),
    }
}

/// Decode a feed from a reader.
///
/// The reader is consumed in full; wrap sockets and files in a
/// `BufReader`.
pub fn decode_feed<R: Read>(reader: R) -> Result<Vec<RemoteEntry>> {
    let document: FeedDocument =
        serde_json::from_reader(reader).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(document.markers.into_iter().map(RemoteEntry::from).collect())
}

/// Decode a feed held in memory.
pub fn decode_feed_slice(bytes: &[u8]) -> Result<Vec<RemoteEntry>> {
    let document: FeedDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(document.markers.into_iter().map(RemoteEntry::from).collect())
}

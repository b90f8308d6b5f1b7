//! Snapshot DTOs
//!
//! Serialized shape of a map: entries keyed by map key, each with its value
//! and last-access node, plus the TTL in seconds.
//!
//! ```json
//! { "M": { "k": { "Value": 1, "HeapNode": { "Time": "2024-01-01T00:00:00Z", "Key": "k" } } }, "T": 60 }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whole-map snapshot document.
///
/// Both fields are optional on input so that `{}` and documents carrying
/// only unknown fields can be recognised as empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<V> {
    /// Entries keyed by map key
    #[serde(rename = "M")]
    pub entries: Option<HashMap<String, EntrySnapshot<V>>>,
    /// TTL in seconds
    #[serde(rename = "T")]
    pub ttl_seconds: Option<u64>,
}

impl<V> Snapshot<V> {
    /// Returns true when the document carries neither entries nor a TTL.
    pub fn is_blank(&self) -> bool {
        self.entries.is_none() && self.ttl_seconds.is_none()
    }
}

/// A single entry inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySnapshot<V> {
    /// The stored value
    #[serde(rename = "Value")]
    pub value: V,
    /// Last-access record of the entry
    #[serde(rename = "HeapNode")]
    pub heap_node: NodeSnapshot,
}

/// Last-access record of a snapshot entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Last access, RFC 3339
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    /// Key of the entry; the enclosing map key wins on load
    #[serde(rename = "Key", default)]
    pub key: String,
}

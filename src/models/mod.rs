//! Serialized models
//!
//! DTOs describing the snapshot document a map is saved to and restored from.

pub mod snapshot;

pub use snapshot::{EntrySnapshot, NodeSnapshot, Snapshot};

//! Cache Module
//!
//! Provides the in-memory TTL map: the staleness index, the entry table
//! built on it, the locked map type and its snapshot codec.

mod codec;
mod entry;
mod map;
mod staleness;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use map::TtlMap;
pub use staleness::{NodeRef, StalenessIndex, StalenessNode};
pub use stats::CacheStats;
pub use store::TtlStore;

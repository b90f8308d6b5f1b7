//! Cache Entry Module
//!
//! Defines the structure stored in the entry table for each live key.

use crate::cache::NodeRef;

// == Cache Entry ==
/// A stored value together with the handle of its staleness node.
///
/// The last-access timestamp lives in the node, not here, so that a refresh
/// only touches the index.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Handle of this entry's node in the staleness index
    pub(crate) staleness_ref: NodeRef,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    pub(crate) fn new(value: V, staleness_ref: NodeRef) -> Self {
        Self {
            value,
            staleness_ref,
        }
    }
}

//! Staleness Index Module
//!
//! Min-heap over `(timestamp, key)` nodes ordering entries by last access.
//!
//! Nodes live in stable slots so an entry can keep a [`NodeRef`] to its node
//! and refresh the timestamp in place. A refresh repairs the heap with a
//! sift anchored at the node's current position instead of rebuilding it.

use chrono::{DateTime, Utc};

// == Staleness Node ==
/// Last-access record for a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessNode {
    /// Instant of the last put or get of the key
    pub timestamp: DateTime<Utc>,
    /// Key of the entry this node tracks
    pub key: String,
}

impl StalenessNode {
    /// Creates a new node.
    pub fn new(timestamp: DateTime<Utc>, key: impl Into<String>) -> Self {
        Self {
            timestamp,
            key: key.into(),
        }
    }

    // Ties on timestamp fall back to the key so ordering stays total.
    fn precedes(&self, other: &Self) -> bool {
        (self.timestamp, &self.key) < (other.timestamp, &other.key)
    }
}

// == Node Reference ==
/// Stable handle to a node inside a [`StalenessIndex`].
///
/// Stays valid until the node is popped or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

#[derive(Debug)]
struct Slot {
    node: StalenessNode,
    /// Current position of this slot in `heap`
    pos: usize,
}

// == Staleness Index ==
/// Min-priority structure keyed by timestamp.
#[derive(Debug, Default)]
pub struct StalenessIndex {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    /// Binary heap of slot ids
    heap: Vec<usize>,
}

impl StalenessIndex {
    // == Constructor ==
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty index with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            heap: Vec::with_capacity(capacity),
        }
    }

    // == Rebuild ==
    /// Builds an index from an unordered collection of nodes in O(n).
    ///
    /// The returned references line up with the input order.
    pub fn from_nodes(nodes: Vec<StalenessNode>) -> (Self, Vec<NodeRef>) {
        let count = nodes.len();
        let slots = nodes
            .into_iter()
            .enumerate()
            .map(|(pos, node)| Some(Slot { node, pos }))
            .collect();

        let mut index = Self {
            slots,
            free: Vec::new(),
            heap: (0..count).collect(),
        };
        for pos in (0..count / 2).rev() {
            index.sift_down(pos);
        }

        (index, (0..count).map(NodeRef).collect())
    }

    // == Insert ==
    /// Adds a node and returns its handle. O(log n).
    pub fn insert(&mut self, node: StalenessNode) -> NodeRef {
        let pos = self.heap.len();
        let slot = Slot { node, pos };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(slot);
                id
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.heap.push(id);
        self.sift_up(pos);
        NodeRef(id)
    }

    // == Peek Min ==
    /// Returns the least recently touched node without removing it. O(1).
    pub fn peek_min(&self) -> Option<&StalenessNode> {
        if self.heap.is_empty() {
            None
        } else {
            Some(self.node_at(0))
        }
    }

    // == Pop Min ==
    /// Removes and returns the least recently touched node. O(log n).
    pub fn pop_min(&mut self) -> Option<StalenessNode> {
        if self.heap.is_empty() {
            None
        } else {
            Some(self.remove_at(0))
        }
    }

    // == Remove ==
    /// Removes the node behind `node_ref`, wherever it sits. O(log n).
    pub fn remove(&mut self, node_ref: NodeRef) -> Option<StalenessNode> {
        let pos = self.slots.get(node_ref.0)?.as_ref()?.pos;
        Some(self.remove_at(pos))
    }

    // == Refresh ==
    /// Sets the timestamp of an existing node and restores heap order.
    ///
    /// Returns false when `node_ref` no longer points at a live node.
    pub fn refresh(&mut self, node_ref: NodeRef, timestamp: DateTime<Utc>) -> bool {
        let pos = match self.slots.get_mut(node_ref.0) {
            Some(Some(slot)) => {
                slot.node.timestamp = timestamp;
                slot.pos
            }
            _ => return false,
        };
        self.repair(pos);
        true
    }

    // == Get ==
    /// Returns the node behind `node_ref`.
    pub fn get(&self, node_ref: NodeRef) -> Option<&StalenessNode> {
        self.slots
            .get(node_ref.0)
            .and_then(|slot| slot.as_ref())
            .map(|slot| &slot.node)
    }

    // == Length ==
    /// Returns the number of live nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    // == Heap Property ==
    /// Checks that every node precedes its children and that slot positions
    /// agree with the heap layout.
    pub fn is_heap_ordered(&self) -> bool {
        let positions_agree = self.heap.iter().enumerate().all(|(pos, &id)| {
            matches!(self.slots.get(id), Some(Some(slot)) if slot.pos == pos)
        });
        let ordered = (1..self.heap.len()).all(|pos| {
            let parent = (pos - 1) / 2;
            !self.node_at(pos).precedes(self.node_at(parent))
        });
        positions_agree && ordered
    }

    // == Internals ==

    fn node_at(&self, pos: usize) -> &StalenessNode {
        match &self.slots[self.heap[pos]] {
            Some(slot) => &slot.node,
            None => unreachable!("heap position {pos} points at a vacant slot"),
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.node_at(a).precedes(self.node_at(b))
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        for pos in [a, b] {
            if let Some(slot) = self.slots[self.heap[pos]].as_mut() {
                slot.pos = pos;
            }
        }
    }

    fn remove_at(&mut self, pos: usize) -> StalenessNode {
        let last = self.heap.len() - 1;
        self.swap(pos, last);
        let Some(id) = self.heap.pop() else {
            unreachable!("remove_at called on an empty heap");
        };
        if pos < self.heap.len() {
            self.repair(pos);
        }

        self.free.push(id);
        match self.slots[id].take() {
            Some(slot) => slot.node,
            None => unreachable!("removed a vacant slot"),
        }
    }

    fn repair(&mut self, pos: usize) {
        if pos > 0 && self.less(pos, (pos - 1) / 2) {
            self.sift_up(pos);
        } else {
            self.sift_down(pos);
        }
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }
}

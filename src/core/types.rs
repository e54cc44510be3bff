//! core::types
//!
//! Strong types for handles into an ownership graph.
//!
//! # Types
//!
//! - [`GraphId`] - Process-unique identity of one graph
//! - [`NodeId`] - Slot index plus generation
//! - [`SharedRef`] - Counted (owning) handle
//! - [`WeakRef`] - Uncounted (non-owning) handle
//!
//! # Ownership
//!
//! A `SharedRef` is one unit of a node's reference count. It is neither
//! `Clone` nor `Copy`: a second owner can only be made through
//! [`OwnershipGraph::clone_ref`](super::graph::OwnershipGraph::clone_ref), and
//! [`OwnershipGraph::release`](super::graph::OwnershipGraph::release) consumes
//! the handle, so a count can never be given back twice.
//!
//! A `WeakRef` is plain data. It may outlive its node; resolving it after the
//! node is destroyed yields nothing, and the generation stamp keeps it from
//! resolving to a later node that reuses the same slot.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one [`OwnershipGraph`](super::graph::OwnershipGraph).
///
/// Handles remember the graph that issued them so a handle from one graph
/// is rejected by another instead of silently aliasing an unrelated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    /// Allocate a fresh, process-unique graph identity.
    pub(crate) fn fresh() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Slot index plus the generation the slot had when the node was created.
///
/// # Example
///
/// ```
/// use ownergraph::core::graph::OwnershipGraph;
///
/// let mut graph = OwnershipGraph::new();
/// let node = graph.create(7);
/// assert_eq!(node.id().to_string(), "#0.0");
/// # graph.release(node).unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this node was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn slot(&self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A counted handle to a live node.
///
/// Holding a `SharedRef` keeps the node alive. Give it back with
/// [`OwnershipGraph::release`](super::graph::OwnershipGraph::release); a
/// handle that is simply dropped keeps its count forever.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "a SharedRef holds a reference count; give it back with OwnershipGraph::release"]
pub struct SharedRef {
    graph: GraphId,
    id: NodeId,
}

impl SharedRef {
    pub(crate) fn new(graph: GraphId, id: NodeId) -> Self {
        Self { graph, id }
    }

    /// Identity of the node this handle owns a count on.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Graph that issued this handle.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Check whether two handles denote the same node.
    pub fn ptr_eq(&self, other: &SharedRef) -> bool {
        self.graph == other.graph && self.id == other.id
    }
}

impl fmt::Display for SharedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A non-owning handle. Never contributes to a node's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakRef {
    graph: GraphId,
    id: NodeId,
}

impl WeakRef {
    pub(crate) fn new(graph: GraphId, id: NodeId) -> Self {
        Self { graph, id }
    }

    /// Identity of the node this handle last pointed at.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Graph that issued this handle.
    pub fn graph(&self) -> GraphId {
        self.graph
    }
}

impl From<&SharedRef> for WeakRef {
    fn from(shared: &SharedRef) -> Self {
        Self::new(shared.graph, shared.id)
    }
}

impl fmt::Display for WeakRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weak {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        let id = NodeId::new(3, 2);
        assert_eq!(id.to_string(), "#3.2");
        assert_eq!(id.index(), 3);
        assert_eq!(id.generation(), 2);
    }

    #[test]
    fn graph_ids_are_unique() {
        let a = GraphId::fresh();
        let b = GraphId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn weak_from_shared_keeps_identity() {
        let graph = GraphId::fresh();
        let shared = SharedRef::new(graph, NodeId::new(1, 0));
        let weak = WeakRef::from(&shared);
        assert_eq!(weak.id(), shared.id());
        assert_eq!(weak.graph(), shared.graph());
        assert_eq!(weak.to_string(), "weak #1.0");
    }

    #[test]
    fn ptr_eq_requires_same_graph() {
        let id = NodeId::new(0, 0);
        let a = SharedRef::new(GraphId::fresh(), id);
        let b = SharedRef::new(GraphId::fresh(), id);
        assert!(!a.ptr_eq(&b));
        let c = SharedRef::new(a.graph(), id);
        assert!(a.ptr_eq(&c));
    }

    #[test]
    fn node_id_serializes_as_struct() {
        let json = serde_json::to_string(&NodeId::new(4, 1)).unwrap();
        assert_eq!(json, r#"{"index":4,"generation":1}"#);
    }
}

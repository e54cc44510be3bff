//! core::graph
//!
//! Reference-counted ownership graph with weak back-references.
//!
//! # Architecture
//!
//! Nodes live in an arena of generation-stamped slots:
//! - A node's count is the number of live [`SharedRef`]s to it, external
//!   handles and incoming `next` edges alike
//! - Each node owns at most one `next` edge, stored as a `SharedRef`
//! - Each node holds at most one `parent` back-reference, stored as a
//!   [`WeakRef`] that never counts
//! - A node is destroyed inside the call that drops its count to zero; its
//!   `next` edge is released in turn, so a chain tears down front to back
//! - A freed slot bumps its generation before it is reused
//!
//! # Invariants
//!
//! - `parent` never keeps a node alive, so a `next` edge paired with a
//!   `parent` back-reference can always be reclaimed
//! - Under [`CyclePolicy::Reject`] the `next` edges form no cycle
//! - Teardown is iterative; chain length does not grow the call stack
//!
//! # Concurrency
//!
//! Single-threaded. Every mutation takes `&mut OwnershipGraph`, so counts are
//! plain integers adjusted under exclusive access, and destruction runs in
//! the call that observed the count reach zero. The graph is `Send`; callers
//! that share one across threads must wrap it in their own lock.
//!
//! # Example
//!
//! ```
//! use ownergraph::core::graph::OwnershipGraph;
//!
//! let mut graph = OwnershipGraph::new();
//! let parent = graph.create(10);
//! let child = graph.create(20);
//!
//! graph.set_next(&parent, &child).unwrap();
//! graph.set_parent(&child, &parent).unwrap();
//!
//! let locked = graph.lock_parent(&child).unwrap().expect("parent is alive");
//! assert_eq!(graph.value(&locked).unwrap(), 10);
//! graph.release(locked).unwrap();
//!
//! // The child only needs its own handle; the parent goes away with its last
//! // external owner and the back-reference simply stops resolving.
//! graph.release(parent).unwrap();
//! assert!(graph.lock_parent(&child).unwrap().is_none());
//! # graph.release(child).unwrap();
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::types::{GraphId, NodeId, SharedRef, WeakRef};

/// Errors from graph operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("node {0} used after release")]
    UseAfterRelease(NodeId),

    #[error("owning edge would close a cycle: {trace}")]
    OwnershipCycle {
        /// Path of the cycle, e.g. `#0.0 -> #1.0 -> #0.0`.
        trace: String,
    },

    #[error("self handle {0} has expired")]
    BadWeakRef(NodeId),

    #[error("reference count of {0} overflowed")]
    CountOverflow(NodeId),

    #[error("no free slot: all {0} slot indices are in use or retired")]
    SlotsExhausted(usize),
}

/// What `set_next` does when the new edge would close an owning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Refuse the edge with [`GraphError::OwnershipCycle`].
    #[default]
    Reject,
    /// Accept it. The nodes on the cycle leak once external owners let go.
    Allow,
}

impl fmt::Display for CyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePolicy::Reject => write!(f, "reject"),
            CyclePolicy::Allow => write!(f, "allow"),
        }
    }
}

/// Runtime options for one graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphConfig {
    /// Handling of owning cycles.
    pub cycle_policy: CyclePolicy,
    /// Reuse freed slots (with a bumped generation).
    pub reuse_slots: bool,
    /// Keep a [`LifecycleEvent`] log.
    pub record_events: bool,
    /// Slots to preallocate.
    pub initial_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cycle_policy: CyclePolicy::Reject,
            reuse_slots: true,
            record_events: true,
            initial_capacity: 0,
        }
    }
}

/// Node creation and destruction, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created { id: NodeId, value: i64 },
    Destroyed { id: NodeId, value: i64 },
}

impl LifecycleEvent {
    /// Node the event is about.
    pub fn id(&self) -> NodeId {
        match self {
            LifecycleEvent::Created { id, .. } | LifecycleEvent::Destroyed { id, .. } => *id,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Created { id, value } => write!(f, "Node {value} created ({id})"),
            LifecycleEvent::Destroyed { id, value } => {
                write!(f, "Node {value} destroyed ({id})")
            }
        }
    }
}

/// Counters for graph activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Nodes created
    pub created: u64,
    /// Nodes destroyed
    pub destroyed: u64,
    /// Counted handles made from existing ones (clones, edges, upgrades)
    pub clones: u64,
    /// Counts given back through `release`
    pub releases: u64,
    /// Highest number of simultaneously live nodes
    pub peak_live: u64,
    /// Creations that landed in a recycled slot
    pub slots_reused: u64,
}

/// Result of giving back one count.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseOutcome {
    /// Node whose count was decremented, if any.
    pub released: Option<NodeId>,
    /// Count left on that node (0 once destroyed).
    pub remaining: u32,
    /// Every node destroyed as a result, in destruction order.
    pub destroyed: Vec<NodeId>,
}

impl ReleaseOutcome {
    /// Whether `id` was destroyed by this release.
    pub fn destroyed(&self, id: NodeId) -> bool {
        self.destroyed.contains(&id)
    }
}

/// A live node.
#[derive(Debug)]
pub struct Node {
    value: i64,
    strong: u32,
    next: Option<SharedRef>,
    parent: Option<WeakRef>,
    this: WeakRef,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.this.id()
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// Current reference count.
    pub fn use_count(&self) -> u32 {
        self.strong
    }

    /// Target of the owning edge.
    pub fn next(&self) -> Option<NodeId> {
        self.next.as_ref().map(SharedRef::id)
    }

    /// The back-reference, which may have expired.
    pub fn parent(&self) -> Option<WeakRef> {
        self.parent
    }

    /// Weak handle to this node, stored at construction.
    ///
    /// Pass it to [`OwnershipGraph::shared_from_this`] to get a counted
    /// handle from code that only has the node itself.
    pub fn this(&self) -> WeakRef {
        self.this
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of reference-counted nodes.
#[derive(Debug)]
pub struct OwnershipGraph {
    id: GraphId,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    slot_limit: usize,
    config: GraphConfig,
    events: Vec<LifecycleEvent>,
    stats: GraphStats,
}

impl Default for OwnershipGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnershipGraph {
    /// Create an empty graph with default options.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with the given options.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            id: GraphId::fresh(),
            slots: Vec::with_capacity(config.initial_capacity),
            free: Vec::new(),
            live: 0,
            slot_limit: u32::MAX as usize,
            config,
            events: Vec::new(),
            stats: GraphStats::default(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|slot| slot.node.as_ref())
    }

    /// Recorded lifecycle events (empty unless `record_events` is on).
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Take the recorded lifecycle events, leaving the log empty.
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Ownership
    // =========================================================================

    /// Allocate a node holding `value`. The returned handle is its only owner.
    ///
    /// # Panics
    ///
    /// If every slot index is in use or retired. See [`Self::try_create`].
    pub fn create(&mut self, value: i64) -> SharedRef {
        match self.try_create(value) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Allocate a node holding `value`, or fail if no slot is available.
    ///
    /// # Errors
    ///
    /// `SlotsExhausted` if no freed slot can be reused and the index space
    /// is used up. The graph is left unchanged.
    pub fn try_create(&mut self, value: i64) -> Result<SharedRef, GraphError> {
        let recycled = if self.config.reuse_slots {
            self.free.pop()
        } else {
            None
        };
        let index = match recycled {
            Some(index) => {
                self.stats.slots_reused += 1;
                index
            }
            None => {
                if self.slots.len() >= self.slot_limit {
                    return Err(GraphError::SlotsExhausted(self.slot_limit));
                }
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let id = NodeId::new(index, slot.generation);
        slot.node = Some(Node {
            value,
            strong: 1,
            next: None,
            parent: None,
            this: WeakRef::new(self.id, id),
        });

        self.live += 1;
        self.stats.created += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.live as u64);
        debug!(graph = %self.id, node = %id, value, "node created");
        self.record(LifecycleEvent::Created { id, value });

        Ok(SharedRef::new(self.id, id))
    }

    /// Make another counted handle to the same node.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the handle was issued by another graph.
    pub fn clone_ref(&mut self, handle: &SharedRef) -> Result<SharedRef, GraphError> {
        let id = handle.id();
        let node = self.resolve_mut(handle)?;
        node.strong = node
            .strong
            .checked_add(1)
            .ok_or(GraphError::CountOverflow(id))?;
        let count = node.strong;

        self.stats.clones += 1;
        trace!(node = %id, count, "shared handle cloned");
        Ok(SharedRef::new(self.id, id))
    }

    /// Give back one count. Destroys the node, and anything only it owned,
    /// before returning if the count reaches zero.
    pub fn release(&mut self, handle: SharedRef) -> Result<ReleaseOutcome, GraphError> {
        self.resolve(&handle)?;
        self.stats.releases += 1;
        Ok(self.release_resolved(handle))
    }

    /// Point `owner`'s owning edge at `target`.
    ///
    /// The target gains a count before the previous edge, if any, is
    /// released; the returned outcome describes that release.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if either handle does not denote a live node of
    ///   this graph
    /// - `OwnershipCycle` if the edge would close a cycle and the policy is
    ///   [`CyclePolicy::Reject`]; the graph is left unchanged
    pub fn set_next(
        &mut self,
        owner: &SharedRef,
        target: &SharedRef,
    ) -> Result<ReleaseOutcome, GraphError> {
        self.resolve_argument(owner, "owner")?;
        self.resolve_argument(target, "target")?;

        if self.config.cycle_policy == CyclePolicy::Reject {
            if let Some(trace) = self.cycle_through(owner.id(), target.id()) {
                return Err(GraphError::OwnershipCycle { trace });
            }
        }

        let edge = self.clone_ref(target)?;
        let previous = self.resolve_mut(owner)?.next.replace(edge);
        debug!(owner = %owner.id(), target = %target.id(), "owning edge set");

        Ok(match previous {
            Some(previous) => self.release_resolved(previous),
            None => ReleaseOutcome::default(),
        })
    }

    /// Drop `owner`'s owning edge, if it has one.
    pub fn clear_next(&mut self, owner: &SharedRef) -> Result<ReleaseOutcome, GraphError> {
        self.resolve_argument(owner, "owner")?;
        let previous = self.resolve_mut(owner)?.next.take();

        Ok(match previous {
            Some(previous) => {
                debug!(owner = %owner.id(), target = %previous.id(), "owning edge cleared");
                self.release_resolved(previous)
            }
            None => ReleaseOutcome::default(),
        })
    }

    /// Record a back-reference from `node` to `target`. `target`'s count is
    /// not touched.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if either handle does not denote a live node of this
    /// graph.
    pub fn set_parent(&mut self, node: &SharedRef, target: &SharedRef) -> Result<(), GraphError> {
        self.resolve_argument(node, "node")?;
        self.resolve_argument(target, "target")?;

        let parent = WeakRef::from(target);
        self.resolve_mut(node)?.parent = Some(parent);
        debug!(node = %node.id(), parent = %target.id(), "back-reference set");
        Ok(())
    }

    /// Forget `node`'s back-reference, returning it.
    pub fn clear_parent(&mut self, node: &SharedRef) -> Result<Option<WeakRef>, GraphError> {
        self.resolve_argument(node, "node")?;
        Ok(self.resolve_mut(node)?.parent.take())
    }

    /// Resolve `node`'s back-reference to a counted handle.
    ///
    /// Returns `None` if no parent was set or the parent has been destroyed.
    pub fn lock_parent(&mut self, node: &SharedRef) -> Result<Option<SharedRef>, GraphError> {
        match self.resolve(node)?.parent {
            Some(parent) => self.upgrade(parent),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Weak handles
    // =========================================================================

    /// Make a weak handle to the node.
    pub fn downgrade(&self, handle: &SharedRef) -> Result<WeakRef, GraphError> {
        self.resolve(handle)?;
        Ok(WeakRef::from(handle))
    }

    /// Resolve a weak handle to a counted one, or `None` if the node is gone.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the handle was issued by another graph.
    pub fn upgrade(&mut self, weak: WeakRef) -> Result<Option<SharedRef>, GraphError> {
        self.check_graph(weak.graph(), weak.id())?;
        let id = weak.id();
        let Some(node) = self.live_node_mut(id) else {
            trace!(node = %id, "weak handle expired");
            return Ok(None);
        };
        node.strong = node
            .strong
            .checked_add(1)
            .ok_or(GraphError::CountOverflow(id))?;

        self.stats.clones += 1;
        trace!(node = %id, "weak handle upgraded");
        Ok(Some(SharedRef::new(self.id, id)))
    }

    /// Whether the node behind a weak handle is gone.
    pub fn is_expired(&self, weak: WeakRef) -> bool {
        self.strong_count(weak) == 0
    }

    /// Count of the node behind a weak handle, 0 once it is gone.
    pub fn strong_count(&self, weak: WeakRef) -> u32 {
        if weak.graph() != self.id {
            return 0;
        }
        self.live_node(weak.id()).map_or(0, Node::use_count)
    }

    /// Get a counted handle to a node from its stored self handle.
    ///
    /// # Errors
    ///
    /// `BadWeakRef` if the node is no longer alive.
    pub fn shared_from_this(&mut self, this: WeakRef) -> Result<SharedRef, GraphError> {
        self.upgrade(this)?.ok_or(GraphError::BadWeakRef(this.id()))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn node(&self, handle: &SharedRef) -> Result<&Node, GraphError> {
        self.resolve(handle)
    }

    pub fn value(&self, handle: &SharedRef) -> Result<i64, GraphError> {
        Ok(self.resolve(handle)?.value)
    }

    pub fn set_value(&mut self, handle: &SharedRef, value: i64) -> Result<(), GraphError> {
        self.resolve_mut(handle)?.value = value;
        Ok(())
    }

    pub fn use_count(&self, handle: &SharedRef) -> Result<u32, GraphError> {
        Ok(self.resolve(handle)?.strong)
    }

    /// Look up a live node by id, without a handle.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.live_node(id)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn record(&mut self, event: LifecycleEvent) {
        if self.config.record_events {
            self.events.push(event);
        }
    }

    fn check_graph(&self, graph: GraphId, id: NodeId) -> Result<(), GraphError> {
        if graph == self.id {
            Ok(())
        } else {
            Err(GraphError::InvalidArgument(format!(
                "handle {id} belongs to graph {graph}, not {}",
                self.id
            )))
        }
    }

    fn resolve(&self, handle: &SharedRef) -> Result<&Node, GraphError> {
        self.check_graph(handle.graph(), handle.id())?;
        let id = handle.id();
        let slot = self.slots.get(id.slot()).ok_or_else(|| {
            GraphError::InvalidArgument(format!("handle {id} does not name a slot"))
        })?;
        if slot.generation != id.generation() {
            return Err(GraphError::UseAfterRelease(id));
        }
        slot.node.as_ref().ok_or(GraphError::UseAfterRelease(id))
    }

    fn resolve_mut(&mut self, handle: &SharedRef) -> Result<&mut Node, GraphError> {
        self.resolve(handle)?;
        let id = handle.id();
        self.live_node_mut(id).ok_or(GraphError::UseAfterRelease(id))
    }

    /// Like `resolve`, but any failure is the caller passing a bad argument.
    fn resolve_argument(&self, handle: &SharedRef, role: &str) -> Result<(), GraphError> {
        match self.resolve(handle) {
            Ok(_) => Ok(()),
            Err(GraphError::UseAfterRelease(id)) => Err(GraphError::InvalidArgument(format!(
                "{role} {id} is not a live node"
            ))),
            Err(GraphError::InvalidArgument(message)) => {
                Err(GraphError::InvalidArgument(format!("{role}: {message}")))
            }
            Err(other) => Err(other),
        }
    }

    fn live_node(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_ref()
    }

    fn live_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.node.as_mut()
    }

    /// Path `owner -> target -> ... -> owner` if following `next` from
    /// `target` leads back to `owner`.
    fn cycle_through(&self, owner: NodeId, target: NodeId) -> Option<String> {
        let mut path = vec![owner];
        let mut current = target;

        // A walk longer than the live population is already looping elsewhere.
        for _ in 0..=self.live {
            path.push(current);
            if current == owner {
                let trace = path
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Some(trace);
            }
            current = self.live_node(current)?.next()?;
        }
        None
    }

    /// Decrement a count known to be held, then destroy every node that
    /// reaches zero. Uses a worklist instead of recursion.
    fn release_resolved(&mut self, handle: SharedRef) -> ReleaseOutcome {
        let mut outcome = ReleaseOutcome {
            released: Some(handle.id()),
            ..ReleaseOutcome::default()
        };
        let mut pending = vec![handle];
        let mut first = true;

        while let Some(handle) = pending.pop() {
            let id = handle.id();
            let Some(node) = self.live_node_mut(id) else {
                continue;
            };
            node.strong -= 1;
            let remaining = node.strong;
            if first {
                outcome.remaining = remaining;
                first = false;
            }

            if remaining > 0 {
                trace!(node = %id, count = remaining, "count released");
                continue;
            }
            if let Some(next) = self.destroy(id) {
                pending.push(next);
            }
            outcome.destroyed.push(id);
        }

        outcome
    }

    /// Vacate a slot whose count reached zero, handing back its owning edge.
    fn destroy(&mut self, id: NodeId) -> Option<SharedRef> {
        let slot = self.slots.get_mut(id.slot())?;
        let node = slot.node.take()?;

        // A slot whose generation cannot advance is retired, never reused.
        if let Some(generation) = slot.generation.checked_add(1) {
            slot.generation = generation;
            if self.config.reuse_slots {
                self.free.push(id.index());
            }
        }

        self.live -= 1;
        self.stats.destroyed += 1;
        debug!(graph = %self.id, node = %id, value = node.value, "node destroyed");
        self.record(LifecycleEvent::Destroyed {
            id,
            value: node.value,
        });

        node.next
    }
}

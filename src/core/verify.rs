//! core::verify
//!
//! Read-only audit of an ownership graph.
//!
//! # Checks
//!
//! - **Counts**: every node's count covers at least its incoming `next` edges
//! - **Cycles**: no chain of `next` edges loops back on itself
//! - **Leaks**: every live node is reachable through `next` edges from some
//!   node that still has an external owner
//!
//! Under the default cycle policy the graph cannot fail these checks; they
//! exist to show what a strong back edge costs when cycles are allowed.
//!
//! # Invariants
//!
//! - Never mutates the graph
//! - Must be deterministic (findings are reported in slot order)

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use super::graph::OwnershipGraph;
use super::types::NodeId;

/// Findings from verification.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyError {
    #[error("node {node} has count {count} but {incoming} owning edges point at it")]
    CountMismatch {
        node: NodeId,
        count: u32,
        incoming: u32,
    },

    #[error("ownership cycle: {trace}")]
    OwnershipCycle { trace: String },

    #[error("{} node(s) unreachable from any external owner: {}", .nodes.len(), join_ids(.nodes))]
    Leaked { nodes: Vec<NodeId> },
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of fast verification.
#[derive(Debug, Serialize)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }
}

/// Perform fast verification of the ownership graph.
pub fn fast_verify(graph: &OwnershipGraph) -> VerifyResult {
    let mut errors = Vec::new();
    let incoming = incoming_edges(graph);

    for node in graph.nodes() {
        let edges = incoming.get(&node.id()).copied().unwrap_or(0);
        if node.use_count() < edges {
            errors.push(VerifyError::CountMismatch {
                node: node.id(),
                count: node.use_count(),
                incoming: edges,
            });
        }
    }

    for trace in find_cycles(graph) {
        errors.push(VerifyError::OwnershipCycle { trace });
    }

    let leaked = leaked_nodes(graph);
    if !leaked.is_empty() {
        errors.push(VerifyError::Leaked { nodes: leaked });
    }

    if errors.is_empty() {
        VerifyResult::success()
    } else {
        VerifyResult::failure(errors)
    }
}

/// Live nodes that no external owner can reach.
///
/// A node's external owners are its count minus its incoming `next` edges.
/// Nodes with external owners are roots; everything reachable from a root
/// through `next` edges is held. The rest can never be released.
pub fn leaked_nodes(graph: &OwnershipGraph) -> Vec<NodeId> {
    let incoming = incoming_edges(graph);
    let mut held = HashSet::new();

    for node in graph.nodes() {
        let edges = incoming.get(&node.id()).copied().unwrap_or(0);
        if node.use_count() <= edges {
            continue;
        }
        let mut current = Some(node.id());
        while let Some(id) = current {
            if !held.insert(id) {
                break;
            }
            current = graph.get(id).and_then(|n| n.next());
        }
    }

    graph
        .nodes()
        .map(|node| node.id())
        .filter(|id| !held.contains(id))
        .collect()
}

/// Every distinct owning cycle, each rendered once starting from its
/// lowest-slot member.
pub fn find_cycles(graph: &OwnershipGraph) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut cycles = Vec::new();

    for node in graph.nodes() {
        let mut path = Vec::new();
        let mut on_path = HashSet::new();
        let mut current = Some(node.id());

        while let Some(id) = current {
            if on_path.contains(&id) {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut members = path[start..].to_vec();
                let lowest = members
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, m)| **m)
                    .map_or(0, |(i, _)| i);
                members.rotate_left(lowest);
                members.push(members[0]);
                cycles.push(join_arrow(&members));
                break;
            }
            if !visited.insert(id) {
                break;
            }
            on_path.insert(id);
            path.push(id);
            current = graph.get(id).and_then(|n| n.next());
        }
    }

    cycles
}

fn join_arrow(ids: &[NodeId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn incoming_edges(graph: &OwnershipGraph) -> HashMap<NodeId, u32> {
    let mut incoming = HashMap::new();
    for target in graph.nodes().filter_map(|node| node.next()) {
        *incoming.entry(target).or_insert(0) += 1;
    }
    incoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::{CyclePolicy, GraphConfig};

    fn permissive() -> OwnershipGraph {
        OwnershipGraph::with_config(GraphConfig {
            cycle_policy: CyclePolicy::Allow,
            ..GraphConfig::default()
        })
    }

    #[test]
    fn empty_graph_passes() {
        let graph = OwnershipGraph::new();
        let result = fast_verify(&graph);
        assert!(result.ok);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn weak_back_reference_passes() {
        let mut graph = OwnershipGraph::new();
        let parent = graph.create(10);
        let child = graph.create(20);
        graph.set_next(&parent, &child).unwrap();
        graph.set_parent(&child, &parent).unwrap();
        graph.release(child).unwrap();

        // child is held only through the edge, but parent is held externally.
        assert!(fast_verify(&graph).ok);
        graph.release(parent).unwrap();
        assert!(fast_verify(&graph).ok);
    }

    #[test]
    fn strong_back_edge_reports_cycle_and_leak() {
        let mut graph = permissive();
        let a = graph.create(1);
        let b = graph.create(2);
        let (a_id, b_id) = (a.id(), b.id());
        graph.set_next(&a, &b).unwrap();
        graph.set_next(&b, &a).unwrap();

        // Still held externally: a cycle, but nothing leaked yet.
        let result = fast_verify(&graph);
        assert!(!result.ok);
        assert_eq!(
            result.errors,
            vec![VerifyError::OwnershipCycle {
                trace: format!("{a_id} -> {b_id} -> {a_id}"),
            }]
        );

        graph.release(a).unwrap();
        graph.release(b).unwrap();
        assert_eq!(leaked_nodes(&graph), vec![a_id, b_id]);

        let result = fast_verify(&graph);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(
            result.errors[1],
            VerifyError::Leaked {
                nodes: vec![a_id, b_id],
            }
        );
    }

    #[test]
    fn three_node_cycle_leaks_every_member() {
        let mut graph = permissive();
        let a = graph.create(1);
        let b = graph.create(2);
        let c = graph.create(3);
        let ids = [a.id(), b.id(), c.id()];
        graph.set_next(&a, &b).unwrap();
        graph.set_next(&b, &c).unwrap();
        graph.set_next(&c, &a).unwrap();
        for handle in [a, b, c] {
            graph.release(handle).unwrap();
        }

        assert_eq!(leaked_nodes(&graph), ids.to_vec());
        assert_eq!(
            find_cycles(&graph),
            vec![format!("{} -> {} -> {} -> {}", ids[0], ids[1], ids[2], ids[0])]
        );
    }

    #[test]
    fn cycle_reachable_from_held_node_is_not_leaked() {
        let mut graph = permissive();
        let root = graph.create(0);
        let a = graph.create(1);
        let b = graph.create(2);
        graph.set_next(&root, &a).unwrap();
        graph.set_next(&a, &b).unwrap();
        graph.set_next(&b, &a).unwrap();
        graph.release(a).unwrap();
        graph.release(b).unwrap();

        assert!(leaked_nodes(&graph).is_empty());
        assert_eq!(find_cycles(&graph).len(), 1);
        graph.release(root).unwrap();
    }

    #[test]
    fn each_cycle_is_reported_once() {
        let mut graph = permissive();
        let a = graph.create(1);
        let b = graph.create(2);
        let c = graph.create(3);
        graph.set_next(&a, &b).unwrap();
        graph.set_next(&b, &a).unwrap();
        graph.set_next(&c, &c).unwrap();

        let cycles = find_cycles(&graph);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1], format!("{0} -> {0}", c.id()));

        for handle in [a, b, c] {
            graph.release(handle).unwrap();
        }
    }

    #[test]
    fn findings_serialize_with_kind_tag() {
        let finding = VerifyError::OwnershipCycle {
            trace: "#0.0 -> #0.0".into(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "ownership_cycle");
        assert_eq!(json["trace"], "#0.0 -> #0.0");
    }
}

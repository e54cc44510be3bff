//! demo::ownership
//!
//! Graph scenarios: unique, shared and weak ownership, cycles, chains, and
//! self handles.

use tracing::debug;

use super::{DemoError, DemoOptions, Scenario, Transcript};
use crate::core::graph::{CyclePolicy, GraphConfig, GraphError, OwnershipGraph};
use crate::core::verify::{fast_verify, leaked_nodes};

/// One owner, moved between bindings. The count never changes.
pub fn unique(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut graph = options.new_graph();
    let mut out = Transcript::new(Scenario::Unique);

    let first = graph.create(1);
    out.events(&mut graph);
    out.line(format!(
        "first owns {first} (use count {})",
        graph.use_count(&first)?
    ));

    let second = first;
    out.line(format!(
        "moved into second: {second} (use count {})",
        graph.use_count(&second)?
    ));
    out.line("first can no longer be named; the move is checked at compile time");

    graph.release(second)?;
    out.finish(graph)
}

/// Clone a handle, watch the count, release both.
pub fn shared(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut graph = options.new_graph();
    let mut out = Transcript::new(Scenario::Shared);

    let shared1 = graph.create(2);
    out.events(&mut graph);
    {
        let shared2 = graph.clone_ref(&shared1)?;
        out.line(format!("Use count: {}", graph.use_count(&shared1)?));
        graph.release(shared2)?;
    }
    out.line(format!("Use count: {}", graph.use_count(&shared1)?));

    let id = shared1.id();
    let outcome = graph.release(shared1)?;
    out.line(format!(
        "last owner released, {id} destroyed: {}",
        outcome.destroyed(id)
    ));
    out.finish(graph)
}

/// Parent 10 owns child 20; the child points back weakly.
pub fn weak(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut graph = options.new_graph();
    let mut out = Transcript::new(Scenario::Weak);

    let parent = graph.create(10);
    let child = graph.create(20);
    out.events(&mut graph);

    graph.set_next(&parent, &child)?;
    graph.set_parent(&child, &parent)?;
    out.line(format!(
        "parent use count {}, child use count {}",
        graph.use_count(&parent)?,
        graph.use_count(&child)?
    ));

    if let Some(locked) = graph.lock_parent(&child)? {
        out.line(format!("Parent value: {}", graph.value(&locked)?));
        graph.release(locked)?;
    }

    let child_weak = graph.downgrade(&child)?;
    graph.release(child)?;
    out.line("child handle released; the parent's edge keeps it alive");

    graph.release(parent)?;
    out.events(&mut graph);

    match graph.upgrade(child_weak)? {
        Some(handle) => {
            graph.release(handle)?;
            out.line("child still reachable");
        }
        None => out.line("child expired with its parent; nothing dangles"),
    }
    out.finish(graph)
}

/// Three attempts at a parent/child pair that point at each other.
pub fn cycle(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut out = Transcript::new(Scenario::Cycle);

    // Default policy: the second edge is refused.
    let mut guarded = OwnershipGraph::with_config(GraphConfig {
        cycle_policy: CyclePolicy::Reject,
        ..options.graph.clone()
    });
    let a = guarded.create(1);
    let b = guarded.create(2);
    guarded.set_next(&a, &b)?;
    match guarded.set_next(&b, &a) {
        Err(err @ GraphError::OwnershipCycle { .. }) => out.line(format!("reject policy: {err}")),
        Err(err) => return Err(err.into()),
        Ok(_) => out.line("reject policy: edge accepted"),
    }
    guarded.release(a)?;
    guarded.release(b)?;

    // Allowed: both nodes outlive their last external owner.
    let mut leaky = OwnershipGraph::with_config(GraphConfig {
        cycle_policy: CyclePolicy::Allow,
        ..options.graph.clone()
    });
    let a = leaky.create(1);
    let b = leaky.create(2);
    leaky.set_next(&a, &b)?;
    leaky.set_next(&b, &a)?;
    leaky.release(a)?;
    leaky.release(b)?;
    let leaked = leaked_nodes(&leaky);
    debug!(count = leaked.len(), "strong back edge leaked nodes");
    out.line(format!(
        "strong back edge: {} node(s) still alive after every owner let go",
        leaky.live_count()
    ));
    for finding in fast_verify(&leaky).errors {
        out.line(format!("audit: {finding}"));
    }

    // Weak back-reference: everything is reclaimed.
    let mut graph = options.new_graph();
    let parent = graph.create(1);
    let child = graph.create(2);
    graph.set_next(&parent, &child)?;
    graph.set_parent(&child, &parent)?;
    graph.release(child)?;
    graph.drain_events();
    graph.release(parent)?;
    out.line("weak back-reference:");
    out.finish(graph)
}

/// Build a chain `1 -> 2 -> ... -> n` held only by its head, then drop the head.
pub fn chain(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut graph = options.new_graph();
    let mut out = Transcript::new(Scenario::Chain);
    let length = options.chain_length.max(1);

    let head = graph.create(1);
    let mut tail = graph.clone_ref(&head)?;
    for value in 2..=length as i64 {
        let next = graph.create(value);
        graph.set_next(&tail, &next)?;
        graph.set_parent(&next, &tail)?;
        graph.release(tail)?;
        tail = next;
    }
    graph.release(tail)?;
    out.events(&mut graph);
    out.line(format!(
        "chain of {} node(s) held by one external handle",
        graph.live_count()
    ));

    let outcome = graph.release(head)?;
    out.line(format!(
        "head released: {} node(s) destroyed, front to back",
        outcome.destroyed.len()
    ));
    out.finish(graph)
}

/// A node gives out a counted handle to itself through its stored self handle.
pub fn self_ref(options: &DemoOptions) -> Result<Transcript, DemoError> {
    let mut graph = options.new_graph();
    let mut out = Transcript::new(Scenario::SelfRef);

    let node = graph.create(42);
    out.events(&mut graph);
    let this = graph.node(&node)?.this();

    let again = graph.shared_from_this(this)?;
    out.line(format!(
        "shared_from_this returned {again}, same node: {}, use count {}",
        again.ptr_eq(&node),
        graph.use_count(&node)?
    ));
    graph.release(again)?;
    graph.release(node)?;
    out.events(&mut graph);

    match graph.shared_from_this(this) {
        Ok(handle) => {
            graph.release(handle)?;
            out.line("shared_from_this after destruction: unexpectedly alive");
        }
        Err(err) => out.line(format!("shared_from_this after destruction: {err}")),
    }
    out.finish(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_transcript() {
        let transcript = unique(&DemoOptions::default()).unwrap();
        assert_eq!(
            transcript.lines,
            vec![
                "Node 1 created (#0.0)",
                "first owns #0.0 (use count 1)",
                "moved into second: #0.0 (use count 1)",
                "first can no longer be named; the move is checked at compile time",
                "Node 1 destroyed (#0.0)",
            ]
        );
    }

    #[test]
    fn shared_transcript() {
        let transcript = shared(&DemoOptions::default()).unwrap();
        assert_eq!(
            transcript.lines,
            vec![
                "Node 2 created (#0.0)",
                "Use count: 2",
                "Use count: 1",
                "last owner released, #0.0 destroyed: true",
                "Node 2 destroyed (#0.0)",
            ]
        );
    }

    #[test]
    fn weak_transcript_destroys_parent_then_child() {
        let transcript = weak(&DemoOptions::default()).unwrap();
        assert_eq!(
            transcript.lines,
            vec![
                "Node 10 created (#0.0)",
                "Node 20 created (#1.0)",
                "parent use count 1, child use count 2",
                "Parent value: 10",
                "child handle released; the parent's edge keeps it alive",
                "Node 10 destroyed (#0.0)",
                "Node 20 destroyed (#1.0)",
                "child expired with its parent; nothing dangles",
            ]
        );
    }

    #[test]
    fn cycle_transcript_reports_leak() {
        let transcript = cycle(&DemoOptions::default()).unwrap();
        let lines = &transcript.lines;
        assert!(lines[0].starts_with("reject policy: owning edge would close a cycle"));
        assert_eq!(
            lines[1],
            "strong back edge: 2 node(s) still alive after every owner let go"
        );
        assert!(lines.iter().any(|l| l == "audit: ownership cycle: #0.0 -> #1.0 -> #0.0"));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("audit: 2 node(s) unreachable")));
        assert_eq!(
            &lines[lines.len() - 3..],
            &[
                "weak back-reference:",
                "Node 1 destroyed (#0.0)",
                "Node 2 destroyed (#1.0)",
            ]
        );
        assert!(transcript.verify.unwrap().ok);
    }

    #[test]
    fn chain_destroys_front_to_back() {
        let options = DemoOptions {
            chain_length: 3,
            ..DemoOptions::default()
        };
        let transcript = chain(&options).unwrap();
        assert_eq!(
            transcript.lines,
            vec![
                "Node 1 created (#0.0)",
                "Node 2 created (#1.0)",
                "Node 3 created (#2.0)",
                "chain of 3 node(s) held by one external handle",
                "head released: 3 node(s) destroyed, front to back",
                "Node 1 destroyed (#0.0)",
                "Node 2 destroyed (#1.0)",
                "Node 3 destroyed (#2.0)",
            ]
        );
    }

    #[test]
    fn chain_of_one() {
        let options = DemoOptions {
            chain_length: 1,
            ..DemoOptions::default()
        };
        let transcript = chain(&options).unwrap();
        assert!(transcript
            .lines
            .contains(&"head released: 1 node(s) destroyed, front to back".to_string()));
    }

    #[test]
    fn self_ref_transcript() {
        let transcript = self_ref(&DemoOptions::default()).unwrap();
        assert_eq!(
            transcript.lines,
            vec![
                "Node 42 created (#0.0)",
                "shared_from_this returned #0.0, same node: true, use count 2",
                "Node 42 destroyed (#0.0)",
                "shared_from_this after destruction: self handle #0.0 has expired",
            ]
        );
    }

    #[test]
    fn scenarios_ignore_disabled_slot_reuse() {
        let mut options = DemoOptions::default();
        options.graph.reuse_slots = false;
        assert!(weak(&options).unwrap().verify.unwrap().ok);
    }
}

//! ownergraph - Reference-counted ownership graphs with weak back-references
//!
//! Nodes are jointly owned through counted handles and linked by owning
//! `next` edges and non-owning `parent` back-references. A parent/child pair
//! built that way is reclaimed as soon as its external owners let go, because
//! the back-reference never counts.
//!
//! # Architecture
//!
//! - [`core`] - Handles, the ownership graph, invariant audit, configuration
//! - [`demo`] - Ownership walkthroughs rendered as transcripts
//! - [`cli`] - Command-line interface layer (parses args, runs demos)
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! 1. A node is destroyed exactly when its last counted handle is released
//! 2. Back-references never extend a node's lifetime
//! 3. A stale handle never resolves to a node that reused its slot
//! 4. Owning cycles are refused unless explicitly allowed, and then reported

pub mod cli;
pub mod core;
pub mod demo;
pub mod ui;

//! core
//!
//! Core domain types and operations for ownergraph.
//!
//! # Modules
//!
//! - [`types`] - Strong types: GraphId, NodeId, SharedRef, WeakRef
//! - [`graph`] - Reference-counted ownership graph
//! - [`verify`] - Read-only audit of ownership invariants
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - A count can only be taken or given back through the graph
//! - Back-references resolve to a live handle or to nothing, never to a
//!   dangling node
//! - All verification is deterministic

pub mod config;
pub mod graph;
pub mod types;
pub mod verify;

//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, verbosity, and diagnostics setup
//!
//! # Design
//!
//! All user-facing output goes through this module so quiet mode and JSON
//! mode are honored in one place.

pub mod output;

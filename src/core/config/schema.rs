//! core::config::schema
//!
//! Configuration schema types.
//!
//! The same [`ConfigFile`] shape is used for the global file and for the
//! project file; the project file only needs to name the keys it overrides.
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad value is reported
//! with its key instead of surfacing later as a confusing demo failure.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::graph::CyclePolicy;

/// Upper bound for `demo.chain_length`.
pub const MAX_CHAIN_LENGTH: usize = 1_000_000;

/// Upper bound for `demo.resource_size` (elements per resource).
pub const MAX_RESOURCE_SIZE: usize = 10_000_000;

/// Upper bound for `demo.iterations`.
pub const MAX_ITERATIONS: usize = 1_000_000;

/// Upper bound for `demo.iterations * demo.resource_size`. The timing
/// scenario keeps that many elements alive at once.
pub const MAX_PERF_ELEMENTS: usize = 50_000_000;

/// Upper bound for `graph.initial_capacity`.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 24;

/// Every settable key, in display order.
pub const KEYS: [&str; 7] = [
    "graph.cycle_policy",
    "graph.reuse_slots",
    "graph.record_events",
    "graph.initial_capacity",
    "demo.chain_length",
    "demo.iterations",
    "demo.resource_size",
];

/// One configuration file.
///
/// # Example
///
/// ```toml
/// [graph]
/// cycle_policy = "reject"
/// reuse_slots = true
/// record_events = true
/// initial_capacity = 16
///
/// [demo]
/// chain_length = 5
/// iterations = 1000
/// resource_size = 10000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Ownership graph options
    pub graph: Option<GraphSection>,

    /// Demonstration defaults
    pub demo: Option<DemoSection>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(graph) = &self.graph {
            if let Some(capacity) = graph.initial_capacity {
                if capacity > MAX_INITIAL_CAPACITY {
                    return Err(ConfigError::InvalidValue(format!(
                        "graph.initial_capacity must be at most {MAX_INITIAL_CAPACITY}, got {capacity}"
                    )));
                }
            }
        }

        if let Some(demo) = &self.demo {
            check_demo_limits(demo.chain_length, demo.iterations, demo.resource_size)?;
        }

        Ok(())
    }

    /// Look up a key as it would appear in the file.
    ///
    /// Returns `Ok(None)` for a known key that this file does not set.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let graph = self.graph.as_ref();
        let demo = self.demo.as_ref();
        let value = match key {
            "graph.cycle_policy" => graph.and_then(|g| g.cycle_policy).map(|p| p.to_string()),
            "graph.reuse_slots" => graph.and_then(|g| g.reuse_slots).map(|v| v.to_string()),
            "graph.record_events" => graph.and_then(|g| g.record_events).map(|v| v.to_string()),
            "graph.initial_capacity" => {
                graph.and_then(|g| g.initial_capacity).map(|v| v.to_string())
            }
            "demo.chain_length" => demo.and_then(|d| d.chain_length).map(|v| v.to_string()),
            "demo.iterations" => demo.and_then(|d| d.iterations).map(|v| v.to_string()),
            "demo.resource_size" => demo.and_then(|d| d.resource_size).map(|v| v.to_string()),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a key from its string form, then re-validate.
    ///
    /// # Errors
    ///
    /// `UnknownKey` for keys outside [`KEYS`], `InvalidValue` if the value
    /// does not parse or is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut updated = self.clone();
        updated.apply(key, value)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "graph.cycle_policy" => {
                let policy = match value {
                    "reject" => CyclePolicy::Reject,
                    "allow" => CyclePolicy::Allow,
                    other => {
                        return Err(ConfigError::InvalidValue(format!(
                            "graph.cycle_policy must be 'reject' or 'allow', got '{other}'"
                        )))
                    }
                };
                self.graph.get_or_insert_with(Default::default).cycle_policy = Some(policy);
            }
            "graph.reuse_slots" => {
                self.graph.get_or_insert_with(Default::default).reuse_slots =
                    Some(parse_bool(key, value)?);
            }
            "graph.record_events" => {
                self.graph.get_or_insert_with(Default::default).record_events =
                    Some(parse_bool(key, value)?);
            }
            "graph.initial_capacity" => {
                self.graph.get_or_insert_with(Default::default).initial_capacity =
                    Some(parse_usize(key, value)?);
            }
            "demo.chain_length" => {
                self.demo.get_or_insert_with(Default::default).chain_length =
                    Some(parse_usize(key, value)?);
            }
            "demo.iterations" => {
                self.demo.get_or_insert_with(Default::default).iterations =
                    Some(parse_usize(key, value)?);
            }
            "demo.resource_size" => {
                self.demo.get_or_insert_with(Default::default).resource_size =
                    Some(parse_usize(key, value)?);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Check demo sizes against their bounds.
///
/// Unset values are skipped. The `iterations * resource_size` product is
/// only checked when both are known.
///
/// # Errors
///
/// `ConfigError::InvalidValue` naming the first value out of range.
pub fn check_demo_limits(
    chain_length: Option<usize>,
    iterations: Option<usize>,
    resource_size: Option<usize>,
) -> Result<(), ConfigError> {
    if let Some(length) = chain_length {
        if length == 0 || length > MAX_CHAIN_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "demo.chain_length must be between 1 and {MAX_CHAIN_LENGTH}, got {length}"
            )));
        }
    }
    if let Some(iterations) = iterations {
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return Err(ConfigError::InvalidValue(format!(
                "demo.iterations must be between 1 and {MAX_ITERATIONS}, got {iterations}"
            )));
        }
    }
    if let Some(size) = resource_size {
        if size > MAX_RESOURCE_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "demo.resource_size must be at most {MAX_RESOURCE_SIZE}, got {size}"
            )));
        }
    }
    if let (Some(iterations), Some(size)) = (iterations, resource_size) {
        let total = iterations.checked_mul(size);
        if total.map_or(true, |total| total > MAX_PERF_ELEMENTS) {
            return Err(ConfigError::InvalidValue(format!(
                "demo.iterations * demo.resource_size must be at most {MAX_PERF_ELEMENTS}, \
                 got {iterations} * {size}"
            )));
        }
    }
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{key} must be true or false, got '{value}'")))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| {
        ConfigError::InvalidValue(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}

/// `[graph]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GraphSection {
    /// "reject" (default) or "allow"
    pub cycle_policy: Option<CyclePolicy>,

    /// Reuse freed slots (default: true)
    pub reuse_slots: Option<bool>,

    /// Record lifecycle events (default: true)
    pub record_events: Option<bool>,

    /// Slots to preallocate (default: 0)
    pub initial_capacity: Option<usize>,
}

/// `[demo]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DemoSection {
    /// Nodes in the chain scenario (default: 5)
    pub chain_length: Option<usize>,

    /// Resources per run in the timing scenario (default: 1000)
    pub iterations: Option<usize>,

    /// Elements per resource in the timing scenario (default: 10000)
    pub resource_size: Option<usize>,
}

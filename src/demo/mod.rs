//! demo
//!
//! Ownership walkthroughs rendered as transcripts.
//!
//! # Scenarios
//!
//! Graph ownership ([`ownership`]):
//! - `unique` - one owner, moved between bindings
//! - `shared` - counted clones and releases
//! - `weak` - parent/child with a weak back-reference
//! - `cycle` - what a strong back edge costs
//! - `chain` - teardown of a linked chain
//! - `self-ref` - a node handing out a handle to itself
//!
//! Value moves ([`moves`]):
//! - `buffer` - move vs clone of a heap buffer
//! - `move-only` - a type that can be moved but not copied
//! - `perf` - timing of copying vs moving heavy values
//!
//! Every scenario except `perf` produces the same transcript on every run.

pub mod moves;
pub mod ownership;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::core::config::{check_demo_limits, Config, ConfigError};
use crate::core::graph::{GraphConfig, GraphError, GraphStats, OwnershipGraph};
use crate::core::verify::{fast_verify, VerifyResult};

/// Errors from running a scenario.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Options(#[from] ConfigError),

    #[error("scenario '{scenario}' left {count} node(s) alive")]
    Unreclaimed { scenario: Scenario, count: usize },
}

/// A named walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    Unique,
    Shared,
    Weak,
    Cycle,
    Chain,
    SelfRef,
    Buffer,
    MoveOnly,
    Perf,
}

impl Scenario {
    /// Every scenario, in presentation order.
    pub const ALL: [Scenario; 9] = [
        Scenario::Unique,
        Scenario::Shared,
        Scenario::Weak,
        Scenario::Cycle,
        Scenario::Chain,
        Scenario::SelfRef,
        Scenario::Buffer,
        Scenario::MoveOnly,
        Scenario::Perf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Unique => "unique",
            Scenario::Shared => "shared",
            Scenario::Weak => "weak",
            Scenario::Cycle => "cycle",
            Scenario::Chain => "chain",
            Scenario::SelfRef => "self-ref",
            Scenario::Buffer => "buffer",
            Scenario::MoveOnly => "move-only",
            Scenario::Perf => "perf",
        }
    }

    /// One-line summary for listings.
    pub fn summary(&self) -> &'static str {
        match self {
            Scenario::Unique => "single owner transferred by move",
            Scenario::Shared => "shared ownership and use counts",
            Scenario::Weak => "weak back-reference in a parent/child pair",
            Scenario::Cycle => "strong back edge leaks, weak one does not",
            Scenario::Chain => "releasing the head of an owning chain",
            Scenario::SelfRef => "a node producing a counted handle to itself",
            Scenario::Buffer => "moving vs cloning a heap buffer",
            Scenario::MoveOnly => "a resource that can be moved but not copied",
            Scenario::Perf => "timing copies against moves",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs for the scenarios.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Options for graphs created by graph scenarios
    pub graph: GraphConfig,
    /// Nodes in the `chain` scenario
    pub chain_length: usize,
    /// Resources per run in the `perf` scenario
    pub iterations: usize,
    /// Elements per resource in the `perf` scenario
    pub resource_size: usize,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DemoOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            graph: config.graph_config(),
            chain_length: config.chain_length(),
            iterations: config.iterations(),
            resource_size: config.resource_size(),
        }
    }

    /// Check the sizes against the same bounds as the config file.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` if a size is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_demo_limits(
            Some(self.chain_length),
            Some(self.iterations),
            Some(self.resource_size),
        )
    }

    /// A graph for one scenario. Events are always recorded: they are the
    /// transcript.
    pub(crate) fn new_graph(&self) -> OwnershipGraph {
        OwnershipGraph::with_config(GraphConfig {
            record_events: true,
            ..self.graph.clone()
        })
    }
}

/// What a scenario printed, plus the final state of its graph.
#[derive(Debug, Serialize)]
pub struct Transcript {
    pub scenario: Scenario,
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GraphStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyResult>,
}

impl Transcript {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            lines: Vec::new(),
            stats: None,
            verify: None,
        }
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Move the graph's pending lifecycle events into the transcript.
    pub fn events(&mut self, graph: &mut OwnershipGraph) {
        self.lines
            .extend(graph.drain_events().iter().map(ToString::to_string));
    }

    /// Close a graph scenario: flush events, attach stats and the audit, and
    /// insist every node was reclaimed.
    pub(crate) fn finish(mut self, mut graph: OwnershipGraph) -> Result<Self, DemoError> {
        self.events(&mut graph);
        if !graph.is_empty() {
            return Err(DemoError::Unreclaimed {
                scenario: self.scenario,
                count: graph.live_count(),
            });
        }
        self.stats = Some(graph.stats());
        self.verify = Some(fast_verify(&graph));
        Ok(self)
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.scenario)?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Run one scenario.
///
/// # Errors
///
/// - `Options` if `options` fails [`DemoOptions::validate`]
/// - `Graph` or `Unreclaimed` if a graph scenario goes wrong
pub fn run(scenario: Scenario, options: &DemoOptions) -> Result<Transcript, DemoError> {
    options.validate()?;
    match scenario {
        Scenario::Unique => ownership::unique(options),
        Scenario::Shared => ownership::shared(options),
        Scenario::Weak => ownership::weak(options),
        Scenario::Cycle => ownership::cycle(options),
        Scenario::Chain => ownership::chain(options),
        Scenario::SelfRef => ownership::self_ref(options),
        Scenario::Buffer => Ok(moves::buffer()),
        Scenario::MoveOnly => Ok(moves::move_only()),
        Scenario::Perf => Ok(moves::perf(options.iterations, options.resource_size)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> DemoOptions {
        DemoOptions {
            iterations: 4,
            resource_size: 16,
            ..DemoOptions::default()
        }
    }

    #[test]
    fn every_scenario_runs() {
        let options = quick();
        for scenario in Scenario::ALL {
            let transcript = run(scenario, &options).unwrap();
            assert_eq!(transcript.scenario, scenario);
            assert!(!transcript.lines.is_empty(), "{scenario} printed nothing");
        }
    }

    #[test]
    fn graph_scenarios_end_clean() {
        let options = quick();
        for scenario in [
            Scenario::Unique,
            Scenario::Shared,
            Scenario::Weak,
            Scenario::Chain,
            Scenario::SelfRef,
        ] {
            let transcript = run(scenario, &options).unwrap();
            assert!(transcript.verify.as_ref().unwrap().ok);
            let stats = transcript.stats.unwrap();
            assert_eq!(stats.created, stats.destroyed);
        }
    }

    #[test]
    fn oversized_options_are_refused_before_running() {
        let options = DemoOptions {
            iterations: 1,
            resource_size: usize::MAX,
            ..DemoOptions::default()
        };
        assert!(matches!(
            run(Scenario::Perf, &options),
            Err(DemoError::Options(ConfigError::InvalidValue(_)))
        ));

        let options = DemoOptions {
            chain_length: 0,
            ..DemoOptions::default()
        };
        assert!(run(Scenario::Chain, &options).is_err());
    }

    #[test]
    fn scenario_names_are_kebab_case() {
        assert_eq!(Scenario::SelfRef.to_string(), "self-ref");
        assert_eq!(
            serde_json::to_value(Scenario::MoveOnly).unwrap(),
            serde_json::json!("move-only")
        );
    }

    #[test]
    fn transcript_display_has_header() {
        let mut transcript = Transcript::new(Scenario::Shared);
        transcript.line("hello");
        assert_eq!(transcript.to_string(), "=== shared ===\nhello\n");
    }

    #[test]
    fn record_events_off_in_config_still_yields_transcript() {
        let mut options = quick();
        options.graph.record_events = false;
        let transcript = run(Scenario::Shared, &options).unwrap();
        assert!(transcript.lines.iter().any(|l| l.contains("destroyed")));
    }
}

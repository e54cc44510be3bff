//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--config <path>`: Use this file as the global config
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::graph::CyclePolicy;
use crate::demo::Scenario;

/// og - Walk through shared, weak, and unique ownership on a live graph
#[derive(Parser, Debug)]
#[command(name = "og")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if og was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Read global configuration from this file instead of the search path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one ownership scenario, or all of them
    #[command(
        name = "demo",
        long_about = "Run an ownership scenario and print its transcript.\n\n\
            Graph scenarios print every node creation and destruction as it \
            happens, then audit the graph: counts must match incoming edges \
            and no node may be left alive. Value scenarios show what moving \
            and cloning owned data does.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Parent/child pair with a weak back-reference
    og demo weak

    # Everything, as JSON for scripting
    og demo all --json

    # A longer chain, torn down from the head
    og demo chain --chain-length 10000

    # Run every scenario with owning cycles permitted
    og demo all --cycle-policy allow"
    )]
    Demo(DemoArgs),

    /// List available scenarios
    #[command(name = "list")]
    List,

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        long_about = "Manage og configuration.\n\n\
            Values are read from the global config file, then overridden by \
            .ownergraph.toml in the working directory. Command-line flags \
            override both.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Show every key with its effective value
    og config list

    # Longer chains by default
    og config set demo.chain_length 20

    # Allow owning cycles, for this directory only
    og config set graph.cycle_policy allow --project"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for og commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    og completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    og completion zsh >> ~/.zshrc

    # Fish
    og completion fish > ~/.config/fish/completions/og.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for `og demo`.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Scenario to run
    #[arg(value_enum)]
    pub scenario: DemoTarget,

    /// Print transcripts as JSON
    #[arg(long)]
    pub json: bool,

    /// Nodes in the chain scenario
    #[arg(long, value_name = "N")]
    pub chain_length: Option<usize>,

    /// Resources per run in the perf scenario
    #[arg(long, value_name = "N")]
    pub iterations: Option<usize>,

    /// Elements per resource in the perf scenario
    #[arg(long, value_name = "N")]
    pub resource_size: Option<usize>,

    /// Policy for owning edges that would close a cycle
    #[arg(long, value_enum)]
    pub cycle_policy: Option<PolicyArg>,
}

/// A scenario name, or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoTarget {
    All,
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

impl DemoTarget {
    /// Scenarios this target expands to, in presentation order.
    pub fn scenarios(self) -> Vec<Scenario> {
        let one = match self {
            DemoTarget::All => return Scenario::ALL.to_vec(),
            DemoTarget::Unique => Scenario::Unique,
            DemoTarget::Shared => Scenario::Shared,
            DemoTarget::Weak => Scenario::Weak,
            DemoTarget::Cycle => Scenario::Cycle,
            DemoTarget::Chain => Scenario::Chain,
            DemoTarget::SelfRef => Scenario::SelfRef,
            DemoTarget::Buffer => Scenario::Buffer,
            DemoTarget::MoveOnly => Scenario::MoveOnly,
            DemoTarget::Perf => Scenario::Perf,
        };
        vec![one]
    }
}

/// Cycle policy as a command-line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Reject,
    Allow,
}

impl From<PolicyArg> for CyclePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Reject => CyclePolicy::Reject,
            PolicyArg::Allow => CyclePolicy::Allow,
        }
    }
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
        /// Write to .ownergraph.toml in the working directory
        #[arg(long)]
        project: bool,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn demo_target_names_match_scenarios() {
        for scenario in Scenario::ALL {
            let target = DemoTarget::from_str(scenario.name(), false).unwrap();
            assert_eq!(target.scenarios(), vec![scenario]);
        }
        assert_eq!(DemoTarget::All.scenarios().len(), Scenario::ALL.len());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["og", "demo", "weak", "--json", "-q"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Demo(args) => {
                assert_eq!(args.scenario, DemoTarget::Weak);
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_scenario() {
        assert!(Cli::try_parse_from(["og", "demo", "nope"]).is_err());
    }
}

//! cli
//!
//! Command-line interface layer for og.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, builds a [`Context`]
//! and dispatches to [`commands`]. Graph work happens in [`crate::demo`] and
//! [`crate::core`].

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::core::config::Config;
use crate::ui::output::{self, Verbosity};

/// Everything a command handler needs from the invocation.
#[derive(Debug)]
pub struct Context {
    /// Directory whose `.ownergraph.toml` applies
    pub cwd: PathBuf,
    /// Explicit global config file from `--config`
    pub config_path: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Effective configuration
    pub config: Config,
}

impl Context {
    pub fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    output::init_tracing(verbosity);

    let cwd = match cli.cwd.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };

    let loaded = Config::load(cli.config.as_deref(), Some(&cwd)).context("Failed to load config")?;
    for warning in &loaded.warnings {
        output::warn(
            format!("{} ({})", warning.message, warning.path.display()),
            verbosity,
        );
    }
    debug!(
        global = ?loaded.config.global_path(),
        project = ?loaded.config.project_path(),
        "configuration loaded"
    );

    let ctx = Context {
        cwd,
        config_path: cli.config.clone(),
        verbosity,
        config: loaded.config,
    };

    commands::dispatch(cli.command, &ctx)
}

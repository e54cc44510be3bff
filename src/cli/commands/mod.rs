//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Merges command flags over the loaded configuration
//! 2. Calls into the library
//! 3. Formats and displays output

mod completion;
mod config_cmd;
mod demo;

use super::args::{Command, ConfigAction};
use super::Context;
use anyhow::Result;

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Demo(args) => demo::demo(ctx, &args),
        Command::List => demo::list(ctx),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set {
                key,
                value,
                project,
            } => config_cmd::set(ctx, &key, &value, project),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

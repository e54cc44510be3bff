//! config command - Get, set, or list configuration values

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::debug;

use crate::cli::Context;
use crate::core::config::{Config, ConfigFile, KEYS};
use crate::ui::output;

/// Get the effective value of a configuration key.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = ctx.config.get(key)?;
    println!("{}", value);
    Ok(())
}

/// Set a configuration value in the global or project file.
pub fn set(ctx: &Context, key: &str, value: &str, project: bool) -> Result<()> {
    let path = target_path(ctx, project)?;

    let mut file = if path.exists() {
        Config::read_file(&path).context("Failed to read config")?
    } else {
        ConfigFile::default()
    };

    file.set(key, value)?;

    let mut merged = ctx.config.clone();
    if project {
        merged.project = Some(file.clone());
    } else {
        merged.global = file.clone();
    }
    merged.check_limits()?;

    Config::write_config_atomic(&path, &file).context("Failed to write config")?;
    debug!(path = %path.display(), key, value, "config written");

    output::print(format!("Set {} = {}", key, value), ctx.verbosity);
    Ok(())
}

/// List every key with its effective value.
pub fn list(ctx: &Context) -> Result<()> {
    if !ctx.quiet() {
        println!("# Global: {}", describe(ctx.config.global_path()));
        println!("# Project: {}", describe(ctx.config.project_path()));
    }
    for key in KEYS {
        println!("{} = {}", key, ctx.config.get(key)?);
    }
    Ok(())
}

/// Where `set` writes: the project file, else the file that was loaded,
/// else the canonical global location.
fn target_path(ctx: &Context, project: bool) -> Result<PathBuf> {
    if project {
        return Ok(Config::project_config_path(&ctx.cwd));
    }
    if let Some(path) = ctx.config_path.as_ref() {
        return Ok(path.clone());
    }
    if let Some(path) = ctx.config.global_path() {
        return Ok(path.to_path_buf());
    }
    Ok(Config::global_config_path()?)
}

fn describe(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

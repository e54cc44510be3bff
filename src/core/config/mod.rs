//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! There are two configuration scopes:
//! - **Global**: User-level settings
//! - **Project**: Overrides for the current directory
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! An explicit `--config <path>` replaces the search. Otherwise, in order:
//! 1. `$OWNERGRAPH_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ownergraph/config.toml`
//! 3. `~/.ownergraph/config.toml` (canonical write location)
//!
//! # Project Config Location
//!
//! `.ownergraph.toml` in the project directory.
//!
//! # Example
//!
//! ```no_run
//! use ownergraph::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(None, Some(Path::new("."))).unwrap();
//! let config = result.config;
//!
//! println!("Cycle policy: {}", config.cycle_policy());
//! println!("Chain length: {}", config.chain_length());
//! ```

pub mod schema;

pub use schema::{check_demo_limits, ConfigFile, DemoSection, GraphSection, KEYS};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::graph::{CyclePolicy, GraphConfig};

/// Name of the project-scope config file.
pub const PROJECT_FILE: &str = ".ownergraph.toml";

/// Environment variable naming the global config file.
pub const CONFIG_ENV: &str = "OWNERGRAPH_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: project over global over
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: ConfigFile,
    /// Project configuration (if present)
    pub project: Option<ConfigFile>,
    global_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// `explicit` replaces the global search; if it does not exist yet,
    /// defaults are used and a warning is returned. If
    /// `project_dir` is provided, its `.ownergraph.toml` is layered on top.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or
    /// parsed, or holds an invalid value. Missing files in the search path
    /// are not an error.
    pub fn load(
        explicit: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match explicit {
            Some(path) if path.exists() => (Self::read_file(path)?, Some(path.to_path_buf())),
            Some(path) => {
                warnings.push(ConfigWarning {
                    message: "config file does not exist; using defaults".to_string(),
                    path: path.to_path_buf(),
                });
                (ConfigFile::default(), None)
            }
            None => Self::load_global(&mut warnings)?,
        };

        let (project, project_path) = match project_dir {
            Some(dir) => {
                let path = dir.join(PROJECT_FILE);
                if path.exists() {
                    (Some(Self::read_file(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref p) = project {
            p.validate()?;
        }

        let config = Config {
            global,
            project,
            global_path,
            project_path,
        };
        config.check_limits()?;

        Ok(ConfigLoadResult { config, warnings })
    }

    /// Check the effective demo sizes, which may come from different files.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` if a merged value, or the timing
    /// scenario's `iterations * resource_size`, is out of range.
    pub fn check_limits(&self) -> Result<(), ConfigError> {
        check_demo_limits(
            Some(self.chain_length()),
            Some(self.iterations()),
            Some(self.resource_size()),
        )
    }

    /// Load global configuration from standard locations.
    fn load_global(
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(ConfigFile, Option<PathBuf>), ConfigError> {
        // 1. Check $OWNERGRAPH_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
            warnings.push(ConfigWarning {
                message: format!("${CONFIG_ENV} points at a missing file; ignoring it"),
                path,
            });
        }

        // 2. Check $XDG_CONFIG_HOME/ownergraph/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("ownergraph/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.ownergraph/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".ownergraph/config.toml");
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((ConfigFile::default(), None))
    }

    /// Read and parse a single config file, without validating it.
    pub fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the global file that was loaded, if any.
    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Path of the project file that was loaded, if any.
    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.ownergraph/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".ownergraph/config.toml"))
    }

    /// Get the path for project config in `dir`.
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(PROJECT_FILE)
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file in the
    /// same directory, then renames it over the target.
    pub fn write_config_atomic(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Effective value of `key`, formatted as it would be written.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        if let Some(project) = &self.project {
            if let Some(value) = project.get(key)? {
                return Ok(value);
            }
        }
        if let Some(value) = self.global.get(key)? {
            return Ok(value);
        }
        let value = match key {
            "graph.cycle_policy" => self.cycle_policy().to_string(),
            "graph.reuse_slots" => self.reuse_slots().to_string(),
            "graph.record_events" => self.record_events().to_string(),
            "graph.initial_capacity" => self.initial_capacity().to_string(),
            "demo.chain_length" => self.chain_length().to_string(),
            "demo.iterations" => self.iterations().to_string(),
            "demo.resource_size" => self.resource_size().to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    fn graph_value<T>(&self, pick: impl Fn(&GraphSection) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(|p| p.graph.as_ref())
            .and_then(&pick)
            .or_else(|| self.global.graph.as_ref().and_then(&pick))
    }

    fn demo_value<T>(&self, pick: impl Fn(&DemoSection) -> Option<T>) -> Option<T> {
        self.project
            .as_ref()
            .and_then(|p| p.demo.as_ref())
            .and_then(&pick)
            .or_else(|| self.global.demo.as_ref().and_then(&pick))
    }

    /// Defaults to `reject`.
    pub fn cycle_policy(&self) -> CyclePolicy {
        self.graph_value(|g| g.cycle_policy).unwrap_or_default()
    }

    /// Defaults to `true`.
    pub fn reuse_slots(&self) -> bool {
        self.graph_value(|g| g.reuse_slots).unwrap_or(true)
    }

    /// Defaults to `true`.
    pub fn record_events(&self) -> bool {
        self.graph_value(|g| g.record_events).unwrap_or(true)
    }

    /// Defaults to `0`.
    pub fn initial_capacity(&self) -> usize {
        self.graph_value(|g| g.initial_capacity).unwrap_or(0)
    }

    /// Defaults to `5`.
    pub fn chain_length(&self) -> usize {
        self.demo_value(|d| d.chain_length).unwrap_or(5)
    }

    /// Defaults to `1000`.
    pub fn iterations(&self) -> usize {
        self.demo_value(|d| d.iterations).unwrap_or(1000)
    }

    /// Defaults to `10000`.
    pub fn resource_size(&self) -> usize {
        self.demo_value(|d| d.resource_size).unwrap_or(10_000)
    }

    /// Graph options with precedence applied.
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            cycle_policy: self.cycle_policy(),
            reuse_slots: self.reuse_slots(),
            record_events: self.record_events(),
            initial_capacity: self.initial_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn defaults_without_files() {
        let config = Config::default();
        assert_eq!(config.cycle_policy(), CyclePolicy::Reject);
        assert!(config.reuse_slots());
        assert!(config.record_events());
        assert_eq!(config.chain_length(), 5);
        assert_eq!(config.iterations(), 1000);
        assert_eq!(config.resource_size(), 10_000);
        assert_eq!(config.graph_config(), GraphConfig::default());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        write(&path, "[demo]\nchain_length = 9\n");

        let result = Config::load(Some(&path), None).unwrap();
        assert_eq!(result.config.chain_length(), 9);
        assert_eq!(result.config.global_path(), Some(path.as_path()));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn explicit_missing_file_warns_and_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let result = Config::load(Some(&path), None).unwrap();
        assert_eq!(result.config.global_path(), None);
        assert_eq!(result.config.chain_length(), 5);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, path);
    }

    #[test]
    fn explicit_unreadable_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        write(&path, "[graph]\nnot_a_key = 1\n");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn limits_are_checked_across_files() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        write(&global, "[demo]\niterations = 5000\n");
        write(
            &dir.path().join(PROJECT_FILE),
            "[demo]\nresource_size = 20000\n",
        );

        // Each file is fine alone; together they exceed the element cap.
        let err = Config::load(Some(&global), Some(dir.path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        write(
            &global,
            "[graph]\ncycle_policy = \"allow\"\nreuse_slots = false\n",
        );
        write(
            &dir.path().join(PROJECT_FILE),
            "[graph]\ncycle_policy = \"reject\"\n",
        );

        let config = Config::load(Some(&global), Some(dir.path()))
            .unwrap()
            .config;
        assert_eq!(config.cycle_policy(), CyclePolicy::Reject);
        assert!(!config.reuse_slots());
        assert_eq!(config.get("graph.cycle_policy").unwrap(), "reject");
        assert_eq!(config.get("graph.reuse_slots").unwrap(), "false");
        assert_eq!(config.get("demo.iterations").unwrap(), "1000");
        assert!(config.project_path().is_some());
    }

    #[test]
    fn parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        write(&path, "[graph\n");
        match Config::load(Some(&path), None) {
            Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn invalid_value_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        write(&path, "[demo]\nchain_length = 0\n");
        assert!(matches!(
            Config::load(Some(&path), None),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unknown_key_lookup_fails() {
        let config = Config::default();
        assert!(matches!(
            config.get("graph.color"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn atomic_write_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut file = ConfigFile::default();
        file.set("demo.chain_length", "7").unwrap();

        Config::write_config_atomic(&path, &file).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());

        let config = Config::load(Some(&path), None).unwrap().config;
        assert_eq!(config.chain_length(), 7);
    }
}

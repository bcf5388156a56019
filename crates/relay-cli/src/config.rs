//! Configuration file management for relay.
//!
//! Provides a TOML-based config file at `~/.config/relay/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use relay_core::worker::LaunchConfig;

/// Default turn timeout when nothing else specifies one.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub worker: WorkerSection,
    #[serde(default)]
    pub limits: LimitsSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Path to the worker binary.
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LimitsSection {
    /// Per-turn timeout in seconds (capped at 5 minutes by the core).
    pub timeout_secs: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the relay config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/relay` or `~/.config/relay`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("relay");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("relay")
}

/// Return the path to the relay config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at the default path.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

fn load_config_from(path: &std::path::Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(config, &config_path())
}

fn save_config_to(config: &ConfigFile, path: &std::path::Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// CLI-level overrides, all optional.
#[derive(Debug, Default)]
pub struct Overrides {
    pub program: Option<String>,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct RelayConfig {
    pub launch: LaunchConfig,
    pub timeout: Duration,
}

impl RelayConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - Program: `--program` > `RELAY_WORKER_PROGRAM` env > `worker.program`
    ///   in the config file > error.
    /// - Args / working dir: CLI values win outright when given, otherwise
    ///   the config file's.
    /// - Timeout: `--timeout-secs` > `RELAY_TIMEOUT_SECS` env >
    ///   `limits.timeout_secs` > 120s.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let file_config = load_config().ok();

        let program = if let Some(program) = &overrides.program {
            program.clone()
        } else if let Ok(program) = std::env::var("RELAY_WORKER_PROGRAM") {
            program
        } else if let Some(cfg) = &file_config {
            if cfg.worker.program.is_empty() {
                bail!("worker.program is empty in {}", config_path().display());
            }
            cfg.worker.program.clone()
        } else {
            bail!(
                "worker program not configured; pass --program, set RELAY_WORKER_PROGRAM, \
                 or run `relay init --program <path>`"
            );
        };

        let args = if !overrides.args.is_empty() {
            overrides.args.clone()
        } else {
            file_config
                .as_ref()
                .map(|c| c.worker.args.clone())
                .unwrap_or_default()
        };

        let working_dir = overrides
            .working_dir
            .clone()
            .or_else(|| file_config.as_ref().and_then(|c| c.worker.working_dir.clone()));

        let timeout_secs = if let Some(secs) = overrides.timeout_secs {
            secs
        } else if let Ok(secs) = std::env::var("RELAY_TIMEOUT_SECS") {
            secs.parse()
                .context("RELAY_TIMEOUT_SECS is not a valid number of seconds")?
        } else {
            file_config
                .as_ref()
                .map(|c| c.limits.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS)
        };

        let mut launch = LaunchConfig::new(program).with_args(args);
        if let Some(dir) = working_dir {
            launch = launch.with_working_dir(dir);
        }

        Ok(Self {
            launch,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

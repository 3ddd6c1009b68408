//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - ServerConfig: where the ingest/query api listens.
//!     - HistoryConfig: how many samples the rolling history keeps.
//!     - SnapshotConfig: whether the snapshot starts from seeded readings.
//!     - LoggingConfig: log level and whether readings are echoed to the log.
//!
//! lookup order:
//!     1. $HUB_CONFIG (must load, otherwise startup fails)
//!     2. config/hub.toml
//!     3. ../config/hub.toml
//!     4. built-in defaults
//!
//! ==============================================================================

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "HUB_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained samples (one per ingest, ~4h at 1Hz).
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Start temperature/humidity from the built-in readings instead of unset.
    pub seed_defaults: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0".to_string(), port: 3000 }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: crate::history::DEFAULT_CAPACITY }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { seed_defaults: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

/// Where the effective configuration came from. Logged once tracing is up,
/// since the log level itself lives in the config.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults { rejected: Vec<(PathBuf, String)> },
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "[CONFIG] loaded"),
            ConfigSource::Defaults { rejected } => {
                for (path, reason) in rejected {
                    warn!(path = %path.display(), "[CONFIG] failed to load: {}", reason);
                }
                warn!("[CONFIG] no config file found - using defaults");
            }
        }
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml(&content)
    }

    /// Parse and validate a toml document
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: HubConfig = toml::from_str(content)
            .map_err(|e| anyhow!("Failed to parse config: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load with default fallback. An explicit `$HUB_CONFIG` must load.
    pub fn load_or_default() -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(explicit);
            let config = Self::load(&path)
                .with_context(|| format!("{} points at {}", CONFIG_ENV, path.display()))?;
            return Ok((config, ConfigSource::File(path)));
        }

        let paths = [
            PathBuf::from("config").join("hub.toml"),
            PathBuf::from("..").join("config").join("hub.toml"),
        ];

        let mut rejected = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return Ok((config, ConfigSource::File(path))),
                    Err(e) => rejected.push((path, format!("{:#}", e))),
                }
            }
        }

        Ok((Self::default(), ConfigSource::Defaults { rejected }))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.history.capacity == 0 {
            bail!("history.capacity must be at least 1");
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .with_context(|| format!("invalid server.bind_address {:?}", self.server.bind_address))
    }

    /// Log configuration summary
    pub fn print_summary(&self) {
        info!("┌─────────────────────────────────────────┐");
        info!("│           HUB CONFIGURATION             │");
        info!("├─────────────────────────────────────────┤");
        info!("│ Listen: {}:{}", self.server.bind_address, self.server.port);
        info!("│ History Capacity: {} samples", self.history.capacity);
        info!("│ Seeded Snapshot: {}", self.snapshot.seed_defaults);
        info!("│ Log Level: {}", self.logging.level);
        info!("└─────────────────────────────────────────┘");
    }
}

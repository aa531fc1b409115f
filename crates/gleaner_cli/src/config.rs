//! Configuration file support for gleaner.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GLEANER_`, nested keys joined with
//!    `__`, e.g. `GLEANER_DATABASE__URL`, `GLEANER_SYNC__STALENESS_HOURS`)
//! 3. Config file (./gleaner.toml, then ~/.config/gleaner/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/gleaner/gleaner.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/gleaner/gleaner.db"  # optional, this is the default
//!
//! [sync]
//! staleness_hours = 24
//! subscription_interval_secs = 300
//! user_interval_secs = 3600
//! skip_first = false
//! isolate_provider_failures = false
//! provider_rps = 5
//!
//! [http]
//! timeout_secs = 30
//! user_agent = "gleaner/0.3"
//!
//! [events]
//! queue_capacity = 1024
//! max_deliveries = 3
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use gleaner::events::{DEFAULT_MAX_DELIVERIES, DEFAULT_QUEUE_CAPACITY, EventBusConfig};
use gleaner::http::DEFAULT_USER_AGENT;
use gleaner::provider::AggregationMode;
use gleaner::sync::{
    DEFAULT_STALENESS_HOURS, DEFAULT_SUBSCRIPTION_INTERVAL_SECS, DEFAULT_USER_INTERVAL_SECS,
};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Scheduling and synchronization.
    pub sync: SyncConfig,
    /// Outbound HTTP.
    pub http: HttpConfig,
    /// In-process event bus.
    pub events: EventsConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// Scheduling and synchronization options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Targets not synchronized for this many hours are stale.
    pub staleness_hours: i64,
    /// Seconds between subscription staleness scans.
    pub subscription_interval_secs: u64,
    /// Seconds between user staleness scans.
    pub user_interval_secs: u64,
    /// Wait one interval before the first scan.
    pub skip_first: bool,
    /// Keep results from healthy providers when another provider fails.
    pub isolate_provider_failures: bool,
    /// Requests per second per provider; 0 uses each provider's default.
    pub provider_rps: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_hours: DEFAULT_STALENESS_HOURS,
            subscription_interval_secs: DEFAULT_SUBSCRIPTION_INTERVAL_SECS,
            user_interval_secs: DEFAULT_USER_INTERVAL_SECS,
            skip_first: false,
            isolate_provider_failures: false,
            provider_rps: 0,
        }
    }
}

impl SyncConfig {
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.staleness_hours.max(1))
    }

    pub fn aggregation_mode(&self) -> AggregationMode {
        if self.isolate_provider_failures {
            AggregationMode::Isolated
        } else {
            AggregationMode::FailFast
        }
    }
}

/// Outbound HTTP options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Event bus options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub queue_capacity: usize,
    pub max_deliveries: u32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        }
    }
}

impl EventsConfig {
    pub fn bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            queue_capacity: self.queue_capacity,
            max_deliveries: self.max_deliveries.max(1),
            ..EventBusConfig::default()
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/gleaner/config.toml)
    /// 3. Local config file (./gleaner.toml)
    /// 4. Environment variables with GLEANER_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("gleaner.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./gleaner.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(env_source());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("gleaner.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gleaner").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/gleaner` or `~/.local/state/gleaner`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gleaner").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("GLEANER")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

//! # Docflow Configuration System
//!
//! Layered, environment-aware configuration for the workflow engine.
//!
//! ## Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults ([`DocflowConfig::default`])
//! 2. `config/docflow.toml` (optional)
//! 3. `config/docflow.{environment}.toml` (optional)
//! 4. Environment variables prefixed `DOCFLOW__`, nested with `__`
//!    (e.g. `DOCFLOW__ENGINE__MAX_CONFLICT_RETRIES=5`)
//!
//! The environment comes from `DOCFLOW_ENV`, then `APP_ENV`, defaulting to
//! `development`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let retries = manager.config().engine.max_conflict_retries;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocflowConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub dependency: DependencyConfig,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Conflict retry behaviour of the workflow engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retries after a `lock_version` conflict before surfacing it
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    #[serde(default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
        }
    }
}

impl EngineConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_max_ms)
    }
}

/// What happens to a paused parent when its child document is rejected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildRejectionPolicy {
    /// Parent stays in `en_attente_dependance`; resubmitting the child can still resume it
    #[default]
    RemainPaused,
    /// Parent resumes and its originating task is rejected automatically
    RejectParent,
}

impl ChildRejectionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemainPaused => "remain_paused",
            Self::RejectParent => "reject_parent",
        }
    }
}

impl fmt::Display for ChildRejectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChildRejectionPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remain_paused" => Ok(Self::RemainPaused),
            "reject_parent" => Ok(Self::RejectParent),
            other => Err(ConfigurationError::invalid_value(
                "dependency.child_rejection_policy",
                other,
                "expected remain_paused or reject_parent",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyConfig {
    #[serde(default)]
    pub child_rejection_policy: ChildRejectionPolicy,
}

/// Overdue reporting for pending tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaConfig {
    /// Whether the background sweep should be spawned
    #[serde(default)]
    pub enabled: bool,
    /// Age after which a pending task counts as overdue
    #[serde(default = "default_sla_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_sla_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_seconds: default_sla_timeout_seconds(),
            sweep_interval_seconds: default_sla_sweep_interval_seconds(),
        }
    }
}

impl SlaConfig {
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.timeout_seconds).unwrap_or(i64::MAX / 1000))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the lifecycle broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Delivery of validator notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Upper bound on a single hook call; slower calls are abandoned and logged
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_notification_timeout_ms(),
        }
    }
}

impl NotificationsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,
    },
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Explicit level; falls back to the environment default when unset
    #[serde(default)]
    pub level: Option<String>,
    /// JSON format
    #[serde(default)]
    pub json: bool,
}

// Default value helpers
fn default_max_conflict_retries() -> u32 {
    3
}

fn default_retry_backoff_base_ms() -> u64 {
    10
}

fn default_retry_backoff_max_ms() -> u64 {
    250
}

fn default_sla_timeout_seconds() -> u64 {
    48 * 60 * 60
}

fn default_sla_sweep_interval_seconds() -> u64 {
    5 * 60
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_notification_timeout_ms() -> u64 {
    5_000
}

fn default_pool_size() -> u32 {
    10
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl DocflowConfig {
    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.retry_backoff_base_ms > self.engine.retry_backoff_max_ms {
            return Err(ConfigurationError::invalid_value(
                "engine.retry_backoff_base_ms",
                self.engine.retry_backoff_base_ms.to_string(),
                format!(
                    "must not exceed engine.retry_backoff_max_ms ({})",
                    self.engine.retry_backoff_max_ms
                ),
            ));
        }

        if self.sla.timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "sla.timeout_seconds",
                "0",
                "must be greater than 0",
            ));
        }

        if self.sla.sweep_interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "sla.sweep_interval_seconds",
                "0",
                "must be greater than 0",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "must be greater than 0",
            ));
        }

        if self.notifications.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "notifications.timeout_ms",
                "0",
                "must be greater than 0",
            ));
        }

        if let StorageConfig::Postgres {
            url,
            max_connections,
        } = &self.storage
        {
            if url.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "storage.url",
                    "",
                    "PostgreSQL storage requires a connection url",
                ));
            }
            if *max_connections == 0 {
                return Err(ConfigurationError::invalid_value(
                    "storage.max_connections",
                    "0",
                    "must be greater than 0",
                ));
            }
        }

        if let Some(level) = &self.logging.level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(ConfigurationError::invalid_value(
                    "logging.level",
                    level.clone(),
                    format!("expected one of {LOG_LEVELS:?}"),
                ));
            }
        }

        Ok(())
    }
}

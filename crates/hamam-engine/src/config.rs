//! # Engine Configuration
//!
//! Configuration for the session engine: ledger store, event fan-out,
//! receipt sink and session policy.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HAMAM_DB_PATH=/var/lib/hamam/hamam.db                              │
//! │     HAMAM_RECEIPT_SINK=discard                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/hamam-pos/engine.toml (Linux)                            │
//! │     ~/Library/Application Support/com.hamam.pos/engine.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     database and receipts under the platform data directory           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [database]
//! path = "/var/lib/hamam/hamam.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [events]
//! channel_capacity = 64
//!
//! [receipts]
//! sink = "file"  # file | discard
//! preview_dir = "/var/lib/hamam/receipts"
//!
//! [sessions]
//! reject_cancel_with_payments = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use hamam_db::DbConfig;

use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Ledger store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Pool size. Concurrent front desk operations need at least 2.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hamam", "pos").map(|dirs| dirs.data_dir().to_path_buf())
}

fn default_db_path() -> PathBuf {
    data_dir()
        .map(|dir| dir.join("hamam.db"))
        .unwrap_or_else(|| PathBuf::from("./hamam.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// =============================================================================
// Event Settings
// =============================================================================

/// Event fan-out settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    /// Per-subscriber queue size. Events beyond it are dropped for that
    /// subscriber only.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// =============================================================================
// Receipt Settings
// =============================================================================

/// Which receipt sink the engine delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptSinkKind {
    /// JSON previews written to `preview_dir`.
    #[default]
    File,

    /// Receipts are logged and dropped.
    Discard,
}

impl std::fmt::Display for ReceiptSinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiptSinkKind::File => write!(f, "file"),
            ReceiptSinkKind::Discard => write!(f, "discard"),
        }
    }
}

impl std::str::FromStr for ReceiptSinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" | "preview" => Ok(ReceiptSinkKind::File),
            "discard" | "none" | "off" => Ok(ReceiptSinkKind::Discard),
            other => Err(ConfigError::Invalid(format!(
                "Unknown receipt sink: '{}'. Valid options: file, discard",
                other
            ))),
        }
    }
}

/// Receipt delivery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptSettings {
    #[serde(default)]
    pub sink: ReceiptSinkKind,

    /// Output directory of the file sink.
    #[serde(default = "default_preview_dir")]
    pub preview_dir: PathBuf,
}

fn default_preview_dir() -> PathBuf {
    data_dir()
        .map(|dir| dir.join("receipts"))
        .unwrap_or_else(|| PathBuf::from("./receipts"))
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        ReceiptSettings {
            sink: ReceiptSinkKind::default(),
            preview_dir: default_preview_dir(),
        }
    }
}

// =============================================================================
// Session Policy
// =============================================================================

/// Business policy knobs for session lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Refuse to cancel a session that already has payments recorded.
    /// Off by default: the front desk settles refunds outside the engine.
    #[serde(default)]
    pub reject_cancel_with_payments: bool,
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub events: EventSettings,

    #[serde(default)]
    pub receipts: ReceiptSettings,

    #[serde(default)]
    pub sessions: SessionPolicy,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file. Missing sections and keys take their defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "events.channel_capacity must be greater than 0".into(),
            ));
        }

        if self.receipts.sink == ReceiptSinkKind::File
            && self.receipts.preview_dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid(
                "receipts.preview_dir is required by the file sink".into(),
            ));
        }

        Ok(())
    }

    /// Applies `HAMAM_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("HAMAM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("HAMAM_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Invalid HAMAM_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(sink) = lookup("HAMAM_RECEIPT_SINK") {
            match sink.parse() {
                Ok(kind) => {
                    debug!(sink = %sink, "Overriding receipt sink from environment");
                    self.receipts.sink = kind;
                }
                Err(_) => warn!(value = %sink, "Unknown receipt sink in environment"),
            }
        }

        if let Some(dir) = lookup("HAMAM_RECEIPT_DIR") {
            self.receipts.preview_dir = PathBuf::from(dir);
        }

        if let Some(capacity) = lookup("HAMAM_EVENT_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(n) => self.events.channel_capacity = n,
                Err(_) => warn!(value = %capacity, "Invalid HAMAM_EVENT_CAPACITY"),
            }
        }

        if let Some(flag) = lookup("HAMAM_REJECT_CANCEL_WITH_PAYMENTS") {
            match parse_flag(&flag) {
                Some(b) => self.sessions.reject_cancel_with_payments = b,
                None => warn!(value = %flag, "Invalid HAMAM_REJECT_CANCEL_WITH_PAYMENTS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "hamam", "pos")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    /// Builds the ledger store configuration.
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.events.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.receipts.sink, ReceiptSinkKind::File);
        assert!(!config.sessions.reject_cancel_with_payments);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sink_kind_parsing() {
        assert_eq!("file".parse::<ReceiptSinkKind>().unwrap(), ReceiptSinkKind::File);
        assert_eq!("DISCARD".parse::<ReceiptSinkKind>().unwrap(), ReceiptSinkKind::Discard);
        assert!("printer".parse::<ReceiptSinkKind>().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [receipts]
            sink = "discard"

            [sessions]
            reject_cancel_with_payments = true
            "#,
        )
        .unwrap();

        assert_eq!(config.receipts.sink, ReceiptSinkKind::Discard);
        assert!(config.sessions.reject_cancel_with_payments);
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.events.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[
            ("HAMAM_DB_PATH", "/tmp/h.db"),
            ("HAMAM_DB_MAX_CONNECTIONS", "2"),
            ("HAMAM_RECEIPT_SINK", "discard"),
            ("HAMAM_EVENT_CAPACITY", "8"),
            ("HAMAM_REJECT_CANCEL_WITH_PAYMENTS", "yes"),
        ]));

        assert_eq!(config.database.path, PathBuf::from("/tmp/h.db"));
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.receipts.sink, ReceiptSinkKind::Discard);
        assert_eq!(config.events.channel_capacity, 8);
        assert!(config.sessions.reject_cancel_with_payments);
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(env(&[
            ("HAMAM_DB_MAX_CONNECTIONS", "many"),
            ("HAMAM_RECEIPT_SINK", "printer"),
        ]));

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.receipts.sink, ReceiptSinkKind::File);
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.events.channel_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("engine.toml");

        let mut config = EngineConfig::default();
        config.database.path = dir.path().join("hamam.db");
        config.receipts.sink = ReceiptSinkKind::Discard;
        config.save(Some(path.clone())).unwrap();

        let loaded = EngineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[database\npath = 1").unwrap();

        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_to_db_config() {
        let mut config = EngineConfig::default();
        config.database.path = PathBuf::from("/tmp/x.db");
        config.database.busy_timeout_ms = 250;

        let db = config.to_db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
    }
}

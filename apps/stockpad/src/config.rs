//! # Application Configuration
//!
//! Settings for the app root: where the database lives, how the store
//! formats money, inventory thresholds and outbox batching.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`STOCKPAD_*`)
//! 2. Config file (`stockpad.toml` in the platform config dir, or the
//!    path given in `STOCKPAD_CONFIG`)
//! 3. Defaults
//!
//! ## Example `stockpad.toml`
//! ```toml
//! [database]
//! path = "/data/stockpad.db"
//! max_connections = 5
//!
//! [store]
//! name = "Corner Shop"
//! currency_symbol = "$"
//! currency_decimals = 2
//!
//! [inventory]
//! dead_stock_days = 30
//! low_stock_threshold = 5
//!
//! [sync]
//! batch_size = 50
//! max_attempts = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stockpad_core::{DeadStockPolicy, Money, DEFAULT_DEAD_STOCK_DAYS, DEFAULT_LOW_STOCK_THRESHOLD};
use stockpad_db::DbConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Database file name inside the platform data directory.
const DATABASE_FILE: &str = "stockpad.db";

/// Config file name inside the platform config directory.
const CONFIG_FILE: &str = "stockpad.toml";

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Errors
// =============================================================================

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The platform reports no home directory to derive default paths from.
    #[error("No platform directory available for {0}")]
    NoPlatformDir(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. `None` uses the platform data directory;
    /// `":memory:"` opens a throwaway database.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Minor digits shown in amounts: 2 (cents) or 0 (whole units).
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u8,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            currency_decimals: default_currency_decimals(),
        }
    }
}

/// `[inventory]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Days without a sale after which a product is dead stock.
    #[serde(default = "default_dead_stock_days")]
    pub dead_stock_days: i64,

    /// Default cutoff for the low-stock screen.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            dead_stock_days: default_dead_stock_days(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// `[sync]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Outbox entries pushed per round.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Entries that failed this many times are left for manual attention.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_store_name() -> String {
    "Stockpad".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_currency_decimals() -> u8 {
    2
}

fn default_dead_stock_days() -> i64 {
    DEFAULT_DEAD_STOCK_DAYS
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_batch_size() -> u32 {
    50
}

fn default_max_attempts() -> i64 {
    10
}

// =============================================================================
// AppConfig
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub inventory: InventorySettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Loads configuration from file and environment.
    ///
    /// `config_path` wins over `STOCKPAD_CONFIG`, which wins over the
    /// platform default. A missing file is not an error.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("STOCKPAD_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Configuration for tests and previews: in-memory database, defaults
    /// everywhere else.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.database.path = Some(PathBuf::from(IN_MEMORY));
        config
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPlatformDir("config"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.inventory.dead_stock_days <= 0 {
            return Err(ConfigError::Invalid(
                "inventory.dead_stock_days must be positive".into(),
            ));
        }
        if self.inventory.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "inventory.low_stock_threshold must not be negative".into(),
            ));
        }
        if !matches!(self.store.currency_decimals, 0 | 2) {
            return Err(ConfigError::Invalid(
                "store.currency_decimals must be 0 or 2".into(),
            ));
        }
        if self.sync.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "sync.batch_size must be greater than 0".into(),
            ));
        }
        if self.sync.max_attempts <= 0 {
            return Err(ConfigError::Invalid(
                "sync.max_attempts must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Applies `STOCKPAD_*` environment overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Unparseable numbers are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("STOCKPAD_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(n) = lookup("STOCKPAD_DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.database.max_connections = n;
        }
        if let Some(name) = lookup("STOCKPAD_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(symbol) = lookup("STOCKPAD_CURRENCY_SYMBOL") {
            self.store.currency_symbol = symbol;
        }
        if let Some(days) = lookup("STOCKPAD_DEAD_STOCK_DAYS").and_then(|v| v.parse().ok()) {
            debug!(days, "Overriding dead stock window from environment");
            self.inventory.dead_stock_days = days;
        }
        if let Some(threshold) = lookup("STOCKPAD_LOW_STOCK_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.inventory.low_stock_threshold = threshold;
        }
        if let Some(size) = lookup("STOCKPAD_SYNC_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.sync.batch_size = size;
        }
        if let Some(attempts) = lookup("STOCKPAD_SYNC_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.sync.max_attempts = attempts;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockpad", "stockpad")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolves the database location, creating the data directory when the
    /// platform default is used.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "stockpad", "stockpad")
            .ok_or(ConfigError::NoPlatformDir("data"))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join(DATABASE_FILE))
    }

    /// Pool configuration for [`stockpad_db::Database::new`].
    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        let path = self.database_path()?;

        if path.as_os_str() == IN_MEMORY {
            return Ok(DbConfig::in_memory());
        }

        Ok(DbConfig::new(path).max_connections(self.database.max_connections))
    }

    pub fn dead_stock_policy(&self) -> DeadStockPolicy {
        DeadStockPolicy::from_days(self.inventory.dead_stock_days)
    }

    /// Formats an amount with the store's currency settings.
    pub fn format_money(&self, amount: Money) -> String {
        match self.store.currency_decimals {
            0 => {
                let whole = (amount.cents() as f64 / 100.0).round() as i64;
                format!("{}{}", self.store.currency_symbol, whole)
            }
            _ => format!("{}{}", self.store.currency_symbol, amount),
        }
    }
}

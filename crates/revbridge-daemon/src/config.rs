//! Configuration file management.
//!
//! `config.toml` lives in `$REVBRIDGE_DATA_DIR` (or the platform default
//! data directory). Every field has a default, so a missing file or a
//! partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use revbridge_allocation::calculator::{
    DEFAULT_ENTERPRISE_BPS, DEFAULT_LIQUIDITY_BPS, DEFAULT_RESERVE_BPS, DEFAULT_STAKING_BPS,
};
use revbridge_bridge::{BridgeConfig, RequestDefaults};
use revbridge_types::{AccountId, AllocationConfig, Currency, DestinationSystem, SourceSystem};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "REVBRIDGE_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Control-plane seed values.
    #[serde(default)]
    pub bridge: BridgeSection,
    /// Values used by `bridge_revenue_simple`.
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Control-plane seed values. Only read when the ledger database is new;
/// afterwards the owner changes them through the admin RPC methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Must be set before first start.
    #[serde(default = "zero_account")]
    pub owner: AccountId,
    /// Zero = owner-only bridging.
    #[serde(default = "zero_account")]
    pub operator: AccountId,
    /// Environment discriminator mixed into settlement IDs.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_reserve_bps")]
    pub reserve_bps: u16,
    #[serde(default = "default_liquidity_bps")]
    pub liquidity_bps: u16,
    #[serde(default = "default_enterprise_bps")]
    pub enterprise_bps: u16,
    #[serde(default = "default_staking_bps")]
    pub staking_bps: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSection {
    #[serde(default = "default_currency")]
    pub currency: Currency,
    #[serde(default = "default_source_system")]
    pub source_system: SourceSystem,
    #[serde(default = "default_destination_system")]
    pub destination_system: DestinationSystem,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-subscriber event buffer before a slow subscriber starts lagging.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// Maximum clock skew, in seconds, between a signed write's `issued_at`
    /// and the daemon's clock.
    #[serde(default = "default_request_max_age_secs")]
    pub request_max_age_secs: u64,
}

// Default value functions

fn zero_account() -> AccountId {
    AccountId::ZERO
}

fn default_chain_id() -> u64 {
    1
}

fn default_reserve_bps() -> u16 {
    DEFAULT_RESERVE_BPS
}

fn default_liquidity_bps() -> u16 {
    DEFAULT_LIQUIDITY_BPS
}

fn default_enterprise_bps() -> u16 {
    DEFAULT_ENTERPRISE_BPS
}

fn default_staking_bps() -> u16 {
    DEFAULT_STAKING_BPS
}

fn default_currency() -> Currency {
    RequestDefaults::default().currency
}

fn default_source_system() -> SourceSystem {
    RequestDefaults::default().source_system
}

fn default_destination_system() -> DestinationSystem {
    RequestDefaults::default().destination_system
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_request_max_age_secs() -> u64 {
    300
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            owner: AccountId::ZERO,
            operator: AccountId::ZERO,
            chain_id: default_chain_id(),
            reserve_bps: DEFAULT_RESERVE_BPS,
            liquidity_bps: DEFAULT_LIQUIDITY_BPS,
            enterprise_bps: DEFAULT_ENTERPRISE_BPS,
            staking_bps: DEFAULT_STAKING_BPS,
        }
    }
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            source_system: default_source_system(),
            destination_system: default_destination_system(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            event_buffer: default_event_buffer(),
            request_max_age_secs: default_request_max_age_secs(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Control-plane seed plus request defaults for the bridge.
    pub fn bridge_config(&self) -> BridgeConfig {
        let b = &self.bridge;
        BridgeConfig {
            owner: b.owner,
            operator: b.operator,
            chain_id: b.chain_id,
            allocation: AllocationConfig::new(b.reserve_bps, b.liquidity_bps, b.enterprise_bps, b.staking_bps),
            defaults: RequestDefaults {
                currency: self.defaults.currency,
                source_system: self.defaults.source_system,
                destination_system: self.defaults.destination_system,
            },
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Revbridge")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".revbridge")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/revbridge"))
}

//! Configuration for the relay node
//!
//! Handles policy knobs for transaction admission and cache capacity,
//! loadable from a TOML file with per-field defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "relay_node=debug"); RUST_LOG takes precedence
    #[serde(default)]
    pub filter: Option<String>,
}

/// Relay policy configuration
///
/// The flag mode is fixed for the lifetime of a node: `use_old_flags`
/// selects the legacy size policy that budgets a small number of oversize
/// transactions per cache instead of a flat per-transaction cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Select the legacy oversize-budget size policy
    #[serde(default)]
    pub use_old_flags: bool,

    /// Per-transaction size cap in the modern policy
    #[serde(default = "default_max_relay_transaction_bytes")]
    pub max_relay_transaction_bytes: usize,

    /// Size above which a transaction counts as oversize in the legacy policy
    #[serde(default = "default_old_max_relay_transaction_bytes")]
    pub old_max_relay_transaction_bytes: usize,

    /// How many oversize transactions a cache may hold in the legacy policy
    #[serde(default = "default_old_max_extra_oversize_transactions")]
    pub old_max_extra_oversize_transactions: usize,

    /// Absolute per-transaction size cap in the legacy policy
    #[serde(default = "default_old_max_relay_oversize_transaction_bytes")]
    pub old_max_relay_oversize_transaction_bytes: usize,

    /// Cache capacity in entries (clamped to the u16 index space)
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,

    /// Cache capacity in total transaction bytes
    #[serde(default = "default_cache_max_bytes")]
    pub cache_max_bytes: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_relay_transaction_bytes() -> usize {
    1_000_000
}

fn default_old_max_relay_transaction_bytes() -> usize {
    100_000
}

fn default_old_max_extra_oversize_transactions() -> usize {
    32
}

fn default_old_max_relay_oversize_transaction_bytes() -> usize {
    250_000
}

fn default_cache_max_entries() -> usize {
    7_500
}

fn default_cache_max_bytes() -> usize {
    10_000_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            use_old_flags: false,
            max_relay_transaction_bytes: 1_000_000,
            old_max_relay_transaction_bytes: 100_000,
            old_max_extra_oversize_transactions: 32,
            old_max_relay_oversize_transaction_bytes: 250_000,
            cache_max_entries: 7_500,
            cache_max_bytes: 10_000_000,
            logging: LoggingConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load and validate a configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: RelayConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.max_relay_transaction_bytes > 0,
            "max_relay_transaction_bytes must be positive"
        );
        anyhow::ensure!(
            self.old_max_relay_transaction_bytes <= self.old_max_relay_oversize_transaction_bytes,
            "legacy oversize cap must not be below the legacy normal cap"
        );
        anyhow::ensure!(self.cache_max_entries > 0, "cache_max_entries must be positive");
        anyhow::ensure!(self.cache_max_bytes > 0, "cache_max_bytes must be positive");
        Ok(())
    }
}

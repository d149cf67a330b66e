//! Configuration for the key provider.
//!
//! Everything the provider needs at construction: a vault location, the
//! certificate name, the rollover window for the signing path, and the
//! cache time-to-live. All values can come from the
//! environment (`KEYPLANE_*` for provider settings, `VAULT_*` for the vault
//! connection) or be built directly.

use serde::{Deserialize, Serialize};

use crate::errors::{KeyStoreError, Result};
use crate::source::VaultConfig;

/// Default signing key rollover window, in hours.
pub const DEFAULT_ROLLOVER_WINDOW_HOURS: u64 = 24;

/// Default cache time-to-live, in hours.
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Complete configuration for a vault-backed key provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreConfig {
    /// Vault connection settings.
    pub vault: VaultConfig,

    /// Name of the certificate whose versions supply key material.
    pub certificate_name: String,

    /// Minimum age a version must reach before it signs, giving validator
    /// caches time to learn the key first.
    #[serde(default = "default_rollover_window_hours")]
    pub rollover_window_hours: u64,

    /// Absolute cache expiration for provider results.
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
}

fn default_rollover_window_hours() -> u64 {
    DEFAULT_ROLLOVER_WINDOW_HOURS
}

fn default_cache_ttl_hours() -> u64 {
    DEFAULT_CACHE_TTL_HOURS
}

impl KeyStoreConfig {
    /// Builds a configuration with default windows for the named certificate.
    pub fn new(vault: VaultConfig, certificate_name: impl Into<String>) -> Self {
        Self {
            vault,
            certificate_name: certificate_name.into(),
            rollover_window_hours: DEFAULT_ROLLOVER_WINDOW_HOURS,
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `KEYPLANE_CERTIFICATE_NAME` (required),
    /// `KEYPLANE_ROLLOVER_WINDOW_HOURS` and `KEYPLANE_CACHE_TTL_HOURS`
    /// (optional), plus the `VAULT_*` variables via
    /// [`VaultConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        let certificate_name = std::env::var("KEYPLANE_CERTIFICATE_NAME").map_err(|_| {
            KeyStoreError::config("KEYPLANE_CERTIFICATE_NAME environment variable not set")
        })?;

        let rollover_window_hours = parse_hours_var(
            "KEYPLANE_ROLLOVER_WINDOW_HOURS",
            DEFAULT_ROLLOVER_WINDOW_HOURS,
        )?;
        let cache_ttl_hours =
            parse_hours_var("KEYPLANE_CACHE_TTL_HOURS", DEFAULT_CACHE_TTL_HOURS)?;

        Ok(Self {
            vault: VaultConfig::from_env()?,
            certificate_name,
            rollover_window_hours,
            cache_ttl_hours,
        })
    }

    /// Rollover window as a chrono duration for version selection.
    pub fn rollover_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.rollover_window_hours as i64)
    }

    /// Cache TTL as a std duration for cache entry expiry.
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache_ttl_hours * 3600)
    }
}

fn parse_hours_var(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| KeyStoreError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

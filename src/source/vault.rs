//! HashiCorp Vault certificate source.
//!
//! Maps a named certificate onto a KV v2 secret: the secret's version
//! history is the certificate's version history. Version metadata supplies
//! creation timestamps; a version counts as enabled when it is neither
//! destroyed nor soft-deleted. The version payload carries the PEM key
//! material (`public_key`, optional `private_key`).
//!
//! This module is thin plumbing over `vaultrs`: no retries, no caching, no
//! decision logic. Transient failures propagate unmodified so the caller can
//! treat them as a service health signal.
//!
//! # Example
//!
//! ```rust,ignore
//! use keyplane::{VaultCertificateSource, VaultConfig};
//!
//! let config = VaultConfig {
//!     address: "https://vault.example.com:8200".to_string(),
//!     token: Some("vault-token".to_string()),
//!     namespace: None,
//!     mount_path: "secret".to_string(),
//! };
//! let source = VaultCertificateSource::new(config).await?;
//! let versions = source.list_enabled_versions("token-signing").await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::{CertificateSource, KeyBundle};
use crate::errors::{KeyStoreError, Result};
use crate::version::CertificateVersion;

/// Configuration for the HashiCorp Vault backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200").
    pub address: String,

    /// Vault authentication token (if using token auth).
    pub token: Option<String>,

    /// Vault namespace (for Enterprise multi-tenancy).
    pub namespace: Option<String>,

    /// KV v2 mount path (default: "secret").
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
}

fn default_mount_path() -> String {
    "secret".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8200".to_string(),
            token: None,
            namespace: None,
            mount_path: default_mount_path(),
        }
    }
}

impl VaultConfig {
    /// Load Vault configuration from environment variables.
    ///
    /// Reads `VAULT_ADDR`, `VAULT_TOKEN`, `VAULT_NAMESPACE`, and
    /// `VAULT_MOUNT_PATH` (default "secret").
    ///
    /// # Errors
    ///
    /// [`KeyStoreError::Config`] if `VAULT_ADDR` is not set.
    pub fn from_env() -> Result<Self> {
        let address = std::env::var("VAULT_ADDR")
            .map_err(|_| KeyStoreError::config("VAULT_ADDR environment variable not set"))?;

        let token = std::env::var("VAULT_TOKEN").ok();
        let namespace = std::env::var("VAULT_NAMESPACE").ok();
        let mount_path = std::env::var("VAULT_MOUNT_PATH").unwrap_or_else(|_| "secret".to_string());

        Ok(Self { address, token, namespace, mount_path })
    }
}

/// Certificate source backed by HashiCorp Vault's KV v2 engine.
///
/// # Thread Safety
///
/// `Send + Sync`; can be shared across async tasks behind an `Arc`.
pub struct VaultCertificateSource {
    client: VaultClient,
    mount_path: String,
}

impl VaultCertificateSource {
    /// Creates a new Vault certificate source and probes the server health.
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::Config`] if the configuration is invalid
    /// - [`KeyStoreError::ConnectionFailed`] if Vault is unreachable
    pub async fn new(config: VaultConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(KeyStoreError::config("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(namespace) = config.namespace {
            settings_builder.namespace(Some(namespace));
        }

        let settings = settings_builder.build().map_err(|e| {
            KeyStoreError::config(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            KeyStoreError::connection_failed(format!("Failed to create Vault client: {}", e))
        })?;

        match vaultrs::sys::health(&client).await {
            Ok(_) => {
                tracing::info!(address = %config.address, "Successfully connected to Vault");
            }
            Err(e) => {
                tracing::error!(error = %e, address = %config.address, "Failed to connect to Vault");
                return Err(KeyStoreError::connection_failed(format!(
                    "Vault health check failed: {}",
                    e
                )));
            }
        }

        Ok(Self { client, mount_path: config.mount_path })
    }

    /// Creates a source from `VAULT_*` environment variables.
    pub async fn from_env() -> Result<Self> {
        Self::new(VaultConfig::from_env()?).await
    }
}

/// Classify a vaultrs error: permission problems become authentication
/// failures, everything else is a transient vault access error.
fn map_vault_error(err: ClientError) -> KeyStoreError {
    match err {
        ClientError::APIError { code: 403, errors } => {
            KeyStoreError::authentication_failed(errors.join("; "))
        }
        other => KeyStoreError::vault_access(other.to_string()),
    }
}

fn parse_created_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl CertificateSource for VaultCertificateSource {
    async fn list_enabled_versions(
        &self,
        certificate_name: &str,
    ) -> Result<Vec<CertificateVersion>> {
        let metadata = kv2::read_metadata(&self.client, &self.mount_path, certificate_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    certificate = %certificate_name,
                    "Failed to read certificate metadata from Vault"
                );
                map_vault_error(e)
            })?;

        let mut versions = Vec::new();
        for (version, meta) in metadata.versions {
            // Destroyed or soft-deleted versions are disabled: their payload
            // is gone (or going), so they must never be offered for use.
            let enabled = !meta.destroyed && meta.deletion_time.is_empty();
            if !enabled {
                continue;
            }

            let created_at = parse_created_time(&meta.created_time);
            if created_at.is_none() {
                tracing::warn!(
                    certificate = %certificate_name,
                    version = %version,
                    "Certificate version has unparseable creation time"
                );
            }

            versions.push(CertificateVersion {
                name: certificate_name.to_string(),
                version,
                enabled,
                created_at,
            });
        }

        tracing::debug!(
            certificate = %certificate_name,
            count = versions.len(),
            "Listed enabled certificate versions from Vault"
        );
        Ok(versions)
    }

    async fn fetch_key_material(&self, version: &CertificateVersion) -> Result<KeyBundle> {
        let version_number: u64 = version.version.parse().map_err(|_| {
            KeyStoreError::key_material_unavailable(
                version.key_id(),
                format!("version identifier '{}' is not a KV v2 version number", version.version),
            )
        })?;

        let bundle: KeyBundle =
            kv2::read_version(&self.client, &self.mount_path, &version.name, version_number)
                .await
                .map_err(|e| match e {
                    ClientError::APIError { code: 404, .. } => {
                        KeyStoreError::key_material_unavailable(
                            version.key_id(),
                            "version not found in Vault",
                        )
                    }
                    other => {
                        tracing::error!(
                            error = %other,
                            key_id = %version.key_id(),
                            "Failed to fetch key material from Vault"
                        );
                        map_vault_error(other)
                    }
                })?;

        tracing::debug!(key_id = %version.key_id(), "Fetched key material from Vault");
        Ok(bundle)
    }
}

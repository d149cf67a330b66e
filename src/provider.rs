//! Time-bounded caching provider for signing and validation keys.
//!
//! Wraps the fetch-select-resolve pipeline with one cache slot per purpose.
//! Each slot moves Empty → Populated → Expired lazily: expiry is detected on
//! the next access, there are no background timers. Expiration is absolute
//! from population time (default 24 h), never sliding.
//!
//! Two rules keep the cache honest:
//!
//! - An empty signing result is never cached. No enabled version usually
//!   means a transient condition (vault outage, certificate just deleted),
//!   so the next call must retry rather than freeze the outage for a day.
//! - An empty validation set *is* cached. That is a legitimate steady state
//!   and caching it avoids hammering the vault.
//!
//! Concurrent misses may race to populate a slot; both run the pipeline,
//! last writer wins. The pipeline is a read-only, idempotent fetch, so the
//! duplicate upstream call is the whole cost and no lock serializes reads.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::KeyStoreConfig;
use crate::errors::Result;
use crate::material::{KeyMaterial, KeyMaterialResolver, SigningCredential, ValidationKeySet};
use crate::source::{CertificateSource, VaultCertificateSource};
use crate::version::{select_signing_version, select_validation_versions};

/// Default absolute cache expiration.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// One cached value with its absolute expiration instant.
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    /// Returns the value while the entry is still live.
    fn live(&self) -> Option<T> {
        if Instant::now() < self.expires_at {
            Some(self.value.clone())
        } else {
            None
        }
    }
}

/// Supplies the current signing credential and the full validation key set,
/// fetching from the certificate source at most once per cache window.
///
/// # Thread Safety
///
/// Safe to share across async tasks behind an `Arc`; cache slots are
/// `RwLock`-guarded value swaps.
pub struct CachingKeyProvider<S> {
    source: Arc<S>,
    resolver: KeyMaterialResolver<S>,
    certificate_name: String,
    rollover_window: chrono::Duration,
    cache_ttl: Duration,
    signing: RwLock<Option<CacheEntry<SigningCredential>>>,
    validation: RwLock<Option<CacheEntry<ValidationKeySet>>>,
}

impl<S: CertificateSource> CachingKeyProvider<S> {
    /// Creates a provider over the given source with the default 24 h cache.
    pub fn new(
        source: Arc<S>,
        certificate_name: impl Into<String>,
        rollover_window: chrono::Duration,
    ) -> Self {
        Self {
            resolver: KeyMaterialResolver::new(Arc::clone(&source)),
            source,
            certificate_name: certificate_name.into(),
            rollover_window,
            cache_ttl: DEFAULT_CACHE_TTL,
            signing: RwLock::new(None),
            validation: RwLock::new(None),
        }
    }

    /// Overrides the cache time-to-live.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Returns the credential that should sign tokens right now.
    ///
    /// `Ok(None)` means the certificate currently has no enabled version;
    /// the caller should fail token issuance cleanly for this request. That
    /// outcome is never cached, so the next call re-attempts the fetch.
    ///
    /// # Errors
    ///
    /// Vault failures and unusable key material propagate unchanged; the
    /// cache keeps whatever it held before the failed attempt.
    pub async fn get_signing_credential(&self) -> Result<Option<SigningCredential>> {
        if let Some(entry) = self.signing.read().await.as_ref() {
            if let Some(credential) = entry.live() {
                tracing::debug!(
                    certificate = %self.certificate_name,
                    key_id = %credential.key_id(),
                    "Signing credential cache hit"
                );
                return Ok(Some(credential));
            }
        }

        tracing::debug!(
            certificate = %self.certificate_name,
            "Signing credential cache miss, fetching from source"
        );
        let versions = self.source.list_enabled_versions(&self.certificate_name).await?;

        let selected = match select_signing_version(&versions, self.rollover_window, Utc::now()) {
            Some(version) => version,
            None => {
                tracing::warn!(
                    certificate = %self.certificate_name,
                    "No enabled certificate version available for signing"
                );
                return Ok(None);
            }
        };

        let credential = self.resolver.resolve_signing(&selected).await?;
        *self.signing.write().await = Some(CacheEntry::new(credential.clone(), self.cache_ttl));

        tracing::info!(
            certificate = %self.certificate_name,
            key_id = %credential.key_id(),
            ttl_secs = self.cache_ttl.as_secs(),
            "Populated signing credential cache"
        );
        Ok(Some(credential))
    }

    /// Returns the keys that must be accepted when verifying signatures:
    /// one per enabled certificate version, most-recent-first. Always a
    /// superset of whatever [`get_signing_credential`] currently returns.
    ///
    /// An empty set is cached like any other result.
    ///
    /// [`get_signing_credential`]: Self::get_signing_credential
    pub async fn get_validation_keys(&self) -> Result<ValidationKeySet> {
        if let Some(entry) = self.validation.read().await.as_ref() {
            if let Some(keys) = entry.live() {
                tracing::debug!(
                    certificate = %self.certificate_name,
                    count = keys.len(),
                    "Validation key set cache hit"
                );
                return Ok(keys);
            }
        }

        tracing::debug!(
            certificate = %self.certificate_name,
            "Validation key set cache miss, fetching from source"
        );
        let versions = self.source.list_enabled_versions(&self.certificate_name).await?;

        let mut keys: Vec<KeyMaterial> = Vec::new();
        for version in select_validation_versions(&versions) {
            keys.push(self.resolver.resolve_validation(&version).await?);
        }

        let key_set = ValidationKeySet::new(keys);
        *self.validation.write().await = Some(CacheEntry::new(key_set.clone(), self.cache_ttl));

        tracing::info!(
            certificate = %self.certificate_name,
            count = key_set.len(),
            ttl_secs = self.cache_ttl.as_secs(),
            "Populated validation key set cache"
        );
        Ok(key_set)
    }

    /// Drops both cache slots. The next access fetches from the source.
    pub async fn clear_cache(&self) {
        *self.signing.write().await = None;
        *self.validation.write().await = None;
        tracing::info!(certificate = %self.certificate_name, "Cleared key provider cache");
    }

    /// Forces a fresh fetch for both slots, for rotation scenarios where
    /// waiting out the cache window is not acceptable.
    pub async fn refresh(&self) -> Result<()> {
        self.clear_cache().await;
        self.get_validation_keys().await?;
        self.get_signing_credential().await?;
        Ok(())
    }
}

impl CachingKeyProvider<VaultCertificateSource> {
    /// Builds a vault-backed provider from configuration, probing the vault
    /// on construction.
    pub async fn from_config(config: KeyStoreConfig) -> Result<Self> {
        let cache_ttl = config.cache_ttl();
        let rollover_window = config.rollover_window();
        let source = Arc::new(VaultCertificateSource::new(config.vault).await?);
        Ok(Self::new(source, config.certificate_name, rollover_window).with_cache_ttl(cache_ttl))
    }
}

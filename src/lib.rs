//! # Keyplane
//!
//! Keyplane supplies signing and validation key material to a token-issuing
//! service from HashiCorp Vault, with time-bounded in-memory caching and
//! rollover-aware certificate-version selection.
//!
//! ## Architecture
//!
//! ```text
//! Token-issuing host
//!        ↓
//! CachingKeyProvider  ──  one cache slot per purpose (signing, validation)
//!        ↓
//! version selection (pure)  →  KeyMaterialResolver
//!        ↓                           ↓
//! CertificateSource trait  ←  VaultCertificateSource (KV v2)
//! ```
//!
//! A named certificate has multiple stored versions in the vault. The
//! provider picks the most recent enabled version that has aged past the
//! rollover window for signing (falling back to the newest version for a
//! freshly created certificate), and exposes every enabled version for
//! validation so tokens signed by a recently rotated-out key remain
//! verifiable. Results are cached with an absolute expiration, 24 hours by
//! default.
//!
//! ## Example
//!
//! ```rust,no_run
//! use keyplane::{CachingKeyProvider, KeyStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> keyplane::Result<()> {
//!     let config = KeyStoreConfig::from_env()?;
//!     let provider = CachingKeyProvider::from_config(config).await?;
//!
//!     if let Some(credential) = provider.get_signing_credential().await? {
//!         // sign a token with credential.header() / credential.encoding_key()
//!     }
//!     let validation_keys = provider.get_validation_keys().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod material;
pub mod provider;
pub mod source;
pub mod types;
pub mod version;

// Re-export commonly used types and traits
pub use config::KeyStoreConfig;
pub use errors::{KeyStoreError, Result};
pub use material::{
    KeyMaterial, KeyMaterialResolver, SigningCredential, ValidationKeySet, SIGNING_ALGORITHM,
};
pub use provider::{CachingKeyProvider, DEFAULT_CACHE_TTL};
pub use source::{CertificateSource, KeyBundle, VaultCertificateSource, VaultConfig};
pub use types::SecretPem;
pub use version::{select_signing_version, select_validation_versions, CertificateVersion};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
    }
}

//! Certificate source abstraction.
//!
//! The vault that stores certificate versions is an external collaborator;
//! everything with decision logic in this crate works against the
//! [`CertificateSource`] trait so it can run against an in-memory source in
//! tests and against HashiCorp Vault in production.

pub mod vault;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::SecretPem;
use crate::version::CertificateVersion;

pub use vault::{VaultCertificateSource, VaultConfig};

/// Raw key material for one certificate version as stored in the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBundle {
    /// SPKI PEM public key, always present.
    pub public_key: String,

    /// PKCS#8 PEM private key. Absent when the version was provisioned
    /// without an exportable private portion; such versions can validate
    /// but never sign.
    #[serde(default)]
    pub private_key: Option<SecretPem>,
}

/// Read-only view of a named certificate's version history in a vault.
///
/// Implementations must be side-effect free: both operations are pure reads,
/// which is what makes concurrent cache misses in the provider safe to leave
/// unserialized.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Lists the enabled versions of the named certificate, in arbitrary
    /// order (the selector re-sorts).
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::VaultAccess`] if the vault cannot be reached
    /// - [`KeyStoreError::AuthenticationFailed`] if credentials are rejected
    ///
    /// [`KeyStoreError::VaultAccess`]: crate::errors::KeyStoreError::VaultAccess
    /// [`KeyStoreError::AuthenticationFailed`]: crate::errors::KeyStoreError::AuthenticationFailed
    async fn list_enabled_versions(
        &self,
        certificate_name: &str,
    ) -> Result<Vec<CertificateVersion>>;

    /// Fetches the key material stored for a specific version.
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::KeyMaterialUnavailable`] if the version no longer
    ///   exists or its payload is malformed
    /// - [`KeyStoreError::VaultAccess`] if the vault cannot be reached
    ///
    /// [`KeyStoreError::KeyMaterialUnavailable`]: crate::errors::KeyStoreError::KeyMaterialUnavailable
    /// [`KeyStoreError::VaultAccess`]: crate::errors::KeyStoreError::VaultAccess
    async fn fetch_key_material(&self, version: &CertificateVersion) -> Result<KeyBundle>;
}

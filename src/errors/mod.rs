//! Error types for key store operations.
//!
//! The absence of a usable signing key is deliberately *not* an error here:
//! it surfaces as `Ok(None)` / an empty validation set from the provider, per
//! the degraded-but-valid contract with the token-issuing host. Errors are
//! reserved for conditions the caller should log and treat as a service
//! health signal (vault unreachable, auth failure, broken key material).

use thiserror::Error;

/// Result type for key store operations.
pub type Result<T> = std::result::Result<T, KeyStoreError>;

/// Errors that can occur while fetching or materializing key material.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// Failed to connect to the vault.
    #[error("Vault connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Authentication with the vault failed.
    #[error("Vault authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Transient vault/backend error. Propagated unmodified; retry policy
    /// belongs to the collaborator or an outer layer, never this crate.
    #[error("Vault access error: {message}")]
    VaultAccess { message: String },

    /// A specific enabled certificate version cannot supply usable key
    /// material (missing private portion, unparseable PEM, vanished version).
    #[error("Key material unavailable for '{key_id}': {reason}")]
    KeyMaterialUnavailable { key_id: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KeyStoreError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create a vault access error.
    pub fn vault_access(message: impl Into<String>) -> Self {
        Self::VaultAccess { message: message.into() }
    }

    /// Create a key material unavailable error.
    pub fn key_material_unavailable(key_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyMaterialUnavailable { key_id: key_id.into(), reason: reason.into() }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = KeyStoreError::vault_access("timeout");
        assert!(matches!(err, KeyStoreError::VaultAccess { .. }));
        assert_eq!(err.to_string(), "Vault access error: timeout");

        let err = KeyStoreError::connection_failed("refused");
        assert!(matches!(err, KeyStoreError::ConnectionFailed { .. }));

        let err = KeyStoreError::config("missing address");
        assert!(matches!(err, KeyStoreError::Config { .. }));
    }

    #[test]
    fn test_key_material_unavailable_display() {
        let err = KeyStoreError::key_material_unavailable("signing-cert/v3", "no private key");
        assert!(err.to_string().contains("signing-cert/v3"));
        assert!(err.to_string().contains("no private key"));
    }
}

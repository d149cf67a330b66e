//! Key material types and the resolver that materializes them.
//!
//! A [`KeyMaterialResolver`] turns a selected [`CertificateVersion`] into
//! usable key objects: an RS512 [`SigningCredential`] for producing tokens,
//! or a [`KeyMaterial`] entry for verifying them. Every resolve call is one
//! remote fetch; this component holds no cache and no clock, which keeps it
//! trivially testable. Caching is [`CachingKeyProvider`]'s sole concern.
//!
//! [`CachingKeyProvider`]: crate::provider::CachingKeyProvider

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use std::fmt;
use std::sync::Arc;

use crate::errors::{KeyStoreError, Result};
use crate::source::CertificateSource;
use crate::version::CertificateVersion;

/// Fixed signing algorithm for all vault-backed keys.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS512;

/// A verification key handle plus the algorithm to use with it.
///
/// One instance per certificate version, produced on demand and never
/// mutated after creation.
#[derive(Clone)]
pub struct KeyMaterial {
    key_id: String,
    algorithm: Algorithm,
    decoding_key: DecodingKey,
}

impl KeyMaterial {
    /// Key identifier in `<name>/v<version>` form (JWT `kid`).
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The signing algorithm bound to this key.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Verification key for `jsonwebtoken::decode`.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// The key material currently designated for producing new signatures.
///
/// Carries the verification half as well so a consumer can always validate
/// what the signer currently produces.
#[derive(Clone)]
pub struct SigningCredential {
    material: KeyMaterial,
    encoding_key: EncodingKey,
}

impl SigningCredential {
    /// Key identifier of the version backing this credential.
    pub fn key_id(&self) -> &str {
        self.material.key_id()
    }

    /// The signing algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.material.algorithm()
    }

    /// Signing key for `jsonwebtoken::encode`.
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// The verification half of this credential.
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// A ready-to-use JWT header carrying the algorithm and `kid`.
    pub fn header(&self) -> Header {
        let mut header = Header::new(self.material.algorithm());
        header.kid = Some(self.material.key_id().to_string());
        header
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("key_id", &self.material.key_id)
            .field("algorithm", &self.material.algorithm)
            .finish_non_exhaustive()
    }
}

/// All key material that must be accepted when verifying signatures, one
/// entry per enabled certificate version, most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct ValidationKeySet(Vec<KeyMaterial>);

impl ValidationKeySet {
    /// Builds a key set from resolved materials (already ordered).
    pub fn new(keys: Vec<KeyMaterial>) -> Self {
        Self(keys)
    }

    /// The keys, most-recent-first.
    pub fn keys(&self) -> &[KeyMaterial] {
        &self.0
    }

    /// Looks up a key by its `kid`, as a token verifier would.
    pub fn find(&self, key_id: &str) -> Option<&KeyMaterial> {
        self.0.iter().find(|k| k.key_id() == key_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyMaterial> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ValidationKeySet {
    type Item = &'a KeyMaterial;
    type IntoIter = std::slice::Iter<'a, KeyMaterial>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Converts certificate versions into usable key objects.
///
/// Pure with respect to time: each call performs exactly one fetch against
/// the source and no state is kept between calls.
pub struct KeyMaterialResolver<S> {
    source: Arc<S>,
}

impl<S: CertificateSource> KeyMaterialResolver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Fetches a version's key material and constructs a signing credential.
    ///
    /// # Errors
    ///
    /// [`KeyStoreError::KeyMaterialUnavailable`] if the vault cannot supply
    /// the private portion (insufficient permissions, or a version
    /// provisioned without an exportable key) or the PEM does not parse.
    pub async fn resolve_signing(&self, version: &CertificateVersion) -> Result<SigningCredential> {
        let key_id = version.key_id();
        let bundle = self.source.fetch_key_material(version).await?;

        let private_key = match bundle.private_key {
            Some(ref pem) if !pem.is_empty() => pem,
            _ => {
                return Err(KeyStoreError::key_material_unavailable(
                    &key_id,
                    "vault returned no exportable private key for this version",
                ));
            }
        };

        let encoding_key = EncodingKey::from_rsa_pem(private_key.expose_pem()).map_err(|e| {
            KeyStoreError::key_material_unavailable(
                &key_id,
                format!("private key PEM rejected: {}", e),
            )
        })?;

        let material = build_material(&key_id, &bundle.public_key)?;
        tracing::debug!(key_id = %key_id, "Resolved signing credential");
        Ok(SigningCredential { material, encoding_key })
    }

    /// Fetches a version's key material for signature validation.
    ///
    /// Same fetch path as [`resolve_signing`](Self::resolve_signing); the
    /// source stores one key per version usable for both roles.
    pub async fn resolve_validation(&self, version: &CertificateVersion) -> Result<KeyMaterial> {
        let key_id = version.key_id();
        let bundle = self.source.fetch_key_material(version).await?;
        let material = build_material(&key_id, &bundle.public_key)?;
        tracing::debug!(key_id = %key_id, "Resolved validation key");
        Ok(material)
    }
}

fn build_material(key_id: &str, public_key_pem: &str) -> Result<KeyMaterial> {
    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
        KeyStoreError::key_material_unavailable(key_id, format!("public key PEM rejected: {}", e))
    })?;

    Ok(KeyMaterial {
        key_id: key_id.to_string(),
        algorithm: SIGNING_ALGORITHM,
        decoding_key,
    })
}

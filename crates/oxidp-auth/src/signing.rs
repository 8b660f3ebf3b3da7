//! Signing-credential metadata and the state-hash computation.
//!
//! Token signing itself lives in a separate flow; the authorize pipeline
//! only needs to know the realm's active signing algorithm so the `s_hash`
//! it stashes into the authorization code uses the matching hash family.
//! The active credential is held behind an [`arc_swap::ArcSwap`]: reads
//! dominate (every request with a `state`), rotation is rare and must not
//! disturb concurrent readers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// JOSE signing algorithms the realm may sign tokens with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// ECDSA P-256 with SHA-256.
    ES256,
    /// ECDSA P-384 with SHA-384.
    ES384,
    /// RSASSA-PSS with SHA-256.
    PS256,
}

impl SigningAlgorithm {
    /// Returns the JOSE `alg` value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::PS256 => "PS256",
        }
    }

    /// Hash-family output size in bits.
    #[must_use]
    pub fn hash_bits(&self) -> usize {
        match self {
            Self::RS256 | Self::ES256 | Self::PS256 => 256,
            Self::RS384 | Self::ES384 => 384,
            Self::RS512 => 512,
        }
    }

    /// Computes the OpenID Connect half-hash of a value (`s_hash`,
    /// `c_hash`): hash with the algorithm's family, keep the left-most
    /// half, base64url-encode without padding.
    #[must_use]
    pub fn half_hash(&self, value: &str) -> String {
        let digest: Vec<u8> = match self.hash_bits() {
            256 => Sha256::digest(value.as_bytes()).to_vec(),
            384 => Sha384::digest(value.as_bytes()).to_vec(),
            _ => Sha512::digest(value.as_bytes()).to_vec(),
        };
        URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The realm's active signing credential, as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningCredential {
    /// Key identifier published in the JWKS.
    pub key_id: String,

    /// Algorithm the key signs with.
    pub algorithm: SigningAlgorithm,
}

impl SigningCredential {
    /// Creates a credential reference.
    #[must_use]
    pub fn new(key_id: impl Into<String>, algorithm: SigningAlgorithm) -> Self {
        Self {
            key_id: key_id.into(),
            algorithm,
        }
    }
}

/// Read-mostly cache of the active signing credential.
///
/// Shared across concurrent pipeline executions. `active()` is wait-free;
/// `rotate()` swaps the credential atomically without blocking readers.
pub struct SigningKeyCache {
    active: ArcSwap<SigningCredential>,
}

impl SigningKeyCache {
    /// Creates a cache with the given active credential.
    #[must_use]
    pub fn new(credential: SigningCredential) -> Self {
        Self {
            active: ArcSwap::from_pointee(credential),
        }
    }

    /// Returns the active credential.
    #[must_use]
    pub fn active(&self) -> Arc<SigningCredential> {
        self.active.load_full()
    }

    /// Replaces the active credential (key rotation).
    pub fn rotate(&self, credential: SigningCredential) {
        tracing::info!(
            key_id = %credential.key_id,
            algorithm = %credential.algorithm,
            "rotating active signing credential"
        );
        self.active.store(Arc::new(credential));
    }
}

impl Default for SigningKeyCache {
    fn default() -> Self {
        Self::new(SigningCredential::new("default", SigningAlgorithm::RS256))
    }
}

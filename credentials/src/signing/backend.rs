use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::errors::SigningError;

/// Upper bound on signature size used when a backend cannot report its own.
///
/// Large enough for a 4096-bit RSA key.
pub const DEFAULT_MAX_SIGNATURE_LEN: usize = 512;

/// Identifier of the key a backend should sign or verify with.
///
/// Always supplied by the service, never read from token contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for KeyRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Capability to sign and verify precomputed SHA-512 digests.
#[async_trait]
pub trait SigningBackend: Send + Sync + 'static {
    /// Sign a digest with the given key.
    ///
    /// # Arguments
    /// * `key` - Key to sign with
    /// * `digest` - SHA-512 digest of the message
    ///
    /// # Returns
    /// Raw signature bytes
    ///
    /// # Errors
    /// * `KeyNotFound` - The backend has no key under this reference
    /// * `Rejected` - The backend refused the digest
    /// * `Transport` - The backend could not be reached
    async fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, SigningError>;

    /// Verify a signature over a digest with the given key.
    ///
    /// # Returns
    /// True if the signature matches, false otherwise
    ///
    /// # Errors
    /// Same as [`SigningBackend::sign`]; a mismatching signature is not an error.
    async fn verify(
        &self,
        key: &KeyRef,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError>;

    /// Largest signature this backend can produce, used to pre-size token buffers.
    fn max_signature_len(&self) -> usize {
        DEFAULT_MAX_SIGNATURE_LEN
    }
}

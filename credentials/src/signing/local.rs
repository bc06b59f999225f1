use async_trait::async_trait;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use rsa::RsaPrivateKey;
use rsa::RsaPublicKey;
use sha2::Sha512;

use super::backend::KeyRef;
use super::backend::SigningBackend;
use super::errors::SigningError;

/// In-process RSA signer.
///
/// Signs SHA-512 digests with RSASSA-PKCS1-v1_5, which is deterministic:
/// the same digest always yields the same signature.
pub struct RsaSigner {
    key_id: KeyRef,
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RsaSigner {
    /// Create a signer holding `private_key` under the alias `key_id`.
    ///
    /// Requests naming any other key fail with `KeyNotFound`.
    pub fn new(key_id: KeyRef, private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            key_id,
            private_key,
            public_key,
        }
    }

    /// Load a private key from PEM, accepting both PKCS#8 and PKCS#1 encodings.
    ///
    /// # Errors
    /// * `InvalidKey` - The PEM does not contain an RSA private key
    pub fn from_pem(key_id: KeyRef, pem: &str) -> Result<Self, SigningError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;

        Ok(Self::new(key_id, private_key))
    }

    pub fn key_id(&self) -> &KeyRef {
        &self.key_id
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    fn ensure_key(&self, key: &KeyRef) -> Result<(), SigningError> {
        if key != &self.key_id {
            return Err(SigningError::KeyNotFound(key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SigningBackend for RsaSigner {
    async fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        self.ensure_key(key)?;

        self.private_key
            .sign(Pkcs1v15Sign::new::<Sha512>(), digest)
            .map_err(|e| SigningError::Rejected(e.to_string()))
    }

    async fn verify(
        &self,
        key: &KeyRef,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError> {
        self.ensure_key(key)?;

        Ok(self
            .public_key
            .verify(Pkcs1v15Sign::new::<Sha512>(), digest, signature)
            .is_ok())
    }

    fn max_signature_len(&self) -> usize {
        self.public_key.size()
    }
}

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;

use super::backend::KeyRef;
use super::backend::SigningBackend;
use super::errors::SigningError;

/// Algorithm name sent to the key-management service.
pub const SIGNING_ALGORITHM: &str = "RSASSA_PKCS1_V1_5_SHA_512";

/// Tells the key-management service the message is already hashed.
pub const MESSAGE_TYPE_DIGEST: &str = "DIGEST";

/// Request to sign a digest held by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub key_id: String,
    pub signing_algorithm: String,
    pub message_type: String,
    /// Base64 (standard, padded) digest.
    pub message: String,
}

/// Request to verify a signature over a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub key_id: String,
    pub signing_algorithm: String,
    pub message_type: String,
    pub message: String,
    pub signature: String,
}

/// Transport to an external key-management service.
#[async_trait]
pub trait KeyManagementClient: Send + Sync + 'static {
    /// Ask the service to sign a digest.
    ///
    /// # Returns
    /// Raw signature bytes
    async fn sign(&self, request: &SignRequest) -> Result<Vec<u8>, SigningError>;

    /// Ask the service whether a signature is valid.
    async fn verify(&self, request: &VerifyRequest) -> Result<bool, SigningError>;
}

/// Signing backend that delegates to a key-management service.
///
/// Only the digest crosses the boundary. Every call is a single remote
/// request with no retry; dropping the returned future abandons it.
pub struct RemoteSigner<C>
where
    C: KeyManagementClient,
{
    client: C,
    max_signature_len: usize,
}

impl<C> RemoteSigner<C>
where
    C: KeyManagementClient,
{
    /// Create a remote signer.
    ///
    /// # Arguments
    /// * `client` - Transport to the key-management service
    /// * `max_signature_len` - Size in bytes of the remote key's signatures
    pub fn new(client: C, max_signature_len: usize) -> Self {
        Self {
            client,
            max_signature_len,
        }
    }
}

#[async_trait]
impl<C> SigningBackend for RemoteSigner<C>
where
    C: KeyManagementClient,
{
    async fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        let request = SignRequest {
            key_id: key.to_string(),
            signing_algorithm: SIGNING_ALGORITHM.to_string(),
            message_type: MESSAGE_TYPE_DIGEST.to_string(),
            message: STANDARD.encode(digest),
        };

        self.client.sign(&request).await
    }

    async fn verify(
        &self,
        key: &KeyRef,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError> {
        let request = VerifyRequest {
            key_id: key.to_string(),
            signing_algorithm: SIGNING_ALGORITHM.to_string(),
            message_type: MESSAGE_TYPE_DIGEST.to_string(),
            message: STANDARD.encode(digest),
            signature: STANDARD.encode(signature),
        };

        self.client.verify(&request).await
    }

    fn max_signature_len(&self) -> usize {
        self.max_signature_len
    }
}

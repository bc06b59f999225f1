pub mod backend;
pub mod errors;
pub mod http;
pub mod local;
pub mod remote;

use async_trait::async_trait;

pub use backend::KeyRef;
pub use backend::SigningBackend;
pub use errors::SigningError;
pub use http::HttpKeyManagementClient;
pub use local::RsaSigner;
pub use remote::KeyManagementClient;
pub use remote::RemoteSigner;

/// Signing backend chosen once at startup.
pub enum Signer {
    Local(RsaSigner),
    Remote(RemoteSigner<HttpKeyManagementClient>),
}

#[async_trait]
impl SigningBackend for Signer {
    async fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self {
            Signer::Local(signer) => signer.sign(key, digest).await,
            Signer::Remote(signer) => signer.sign(key, digest).await,
        }
    }

    async fn verify(
        &self,
        key: &KeyRef,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, SigningError> {
        match self {
            Signer::Local(signer) => signer.verify(key, digest, signature).await,
            Signer::Remote(signer) => signer.verify(key, digest, signature).await,
        }
    }

    fn max_signature_len(&self) -> usize {
        match self {
            Signer::Local(signer) => signer.max_signature_len(),
            Signer::Remote(signer) => signer.max_signature_len(),
        }
    }
}

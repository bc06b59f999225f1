use thiserror::Error;

/// Error type for signing backend operations.
///
/// These indicate infrastructure trouble (missing key, unreachable
/// key-management service) rather than adversarial input.
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    #[error("Signing key not found: {0}")]
    KeyNotFound(String),

    #[error("Signing key is invalid: {0}")]
    InvalidKey(String),

    #[error("Signing backend rejected the request: {0}")]
    Rejected(String),

    #[error("Signing backend unreachable: {0}")]
    Transport(String),
}

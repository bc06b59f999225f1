use thiserror::Error;

use crate::signing::SigningError;

/// Structural problems found while scanning untrusted token bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedToken {
    #[error("malformed token structure")]
    Structure,

    #[error("malformed token header")]
    Header,

    #[error("malformed token payload")]
    Payload,

    #[error("malformed token signature")]
    Signature,
}

/// Error type for token issuance.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Failed to sign token: {0}")]
    SigningFailed(#[from] SigningError),
}

/// Outcome of a failed scope check.
///
/// `Unauthorized` deliberately does not say whether the token was malformed,
/// expired, or badly signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Insufficient scope")]
    Forbidden,
}

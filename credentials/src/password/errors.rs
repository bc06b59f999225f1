use thiserror::Error;

/// Error type for password hashing.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
}

/// First composition rule a password failed.
///
/// Messages are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password is required")]
    Required,

    #[error("password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("password requires an uppercase letter")]
    MissingUppercase,

    #[error("password requires a lowercase letter")]
    MissingLowercase,

    #[error("password requires a digit")]
    MissingDigit,

    #[error("password requires a non-alphanumeric character")]
    MissingNonAlphanumeric,

    #[error("password requires at least {min} unique characters")]
    TooFewUniqueChars { min: usize },
}

/// Reasons a stored envelope could not be used.
///
/// Never surfaced to callers of verification, which only see `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid base64")]
    Encoding,

    #[error("envelope is truncated")]
    Truncated,

    #[error("unknown envelope format marker: {0:#04x}")]
    UnknownFormat(u8),

    #[error("unknown hash function id: {0}")]
    UnknownHashFunction(u32),

    #[error("envelope declares zero iterations")]
    ZeroIterations,

    #[error("envelope declares {iterations} iterations, more than the maximum of {max}")]
    TooManyIterations { iterations: u32, max: u32 },
}

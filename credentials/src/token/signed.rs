use std::fmt;

use super::claims::Claims;
use super::codec;
use super::errors::MalformedToken;

/// Signed token bytes.
///
/// A token is never mutated after it has been built. The read accessors
/// decode the payload without checking the signature, so their results are
/// only trustworthy once [`crate::TokenService::verify_token`] returned true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decode the payload claim set.
    pub fn claims(&self) -> Result<Claims, MalformedToken> {
        codec::decode_payload(&self.0)
    }

    /// Numeric claim, or `None` if absent, not a number, or the payload is unreadable.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.claims().ok()?.number(name)
    }

    /// String-array claim, or `None` if absent, of another type, or the payload is unreadable.
    pub fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.claims().ok()?.strings(name).map(<[String]>::to_vec)
    }
}

impl From<Vec<u8>> for Token {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Token {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

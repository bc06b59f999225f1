//! Self-describing password hash envelope.
//!
//! ```text
//! [0]      format marker (0x01)
//! [1..5]   hash function id, big-endian
//! [5..9]   iteration count, big-endian
//! [9..13]  salt length, big-endian
//! [13..]   salt, then the derived key (remaining bytes)
//! ```
//!
//! The whole record is base64 (standard alphabet, padded).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;

use super::errors::EnvelopeError;

pub const FORMAT_MARKER: u8 = 0x01;
pub const HEADER_LEN: usize = 13;

/// PRF used by the key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    HmacSha256,
    HmacSha512,
}

impl HashFunction {
    pub fn id(self) -> u32 {
        match self {
            HashFunction::HmacSha256 => 1,
            HashFunction::HmacSha512 => 2,
        }
    }
}

impl TryFrom<u32> for HashFunction {
    type Error = EnvelopeError;

    /// Unknown ids fail; there is no fallback algorithm.
    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(HashFunction::HmacSha256),
            2 => Ok(HashFunction::HmacSha512),
            other => Err(EnvelopeError::UnknownHashFunction(other)),
        }
    }
}

/// Decoded envelope contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub hash_function: HashFunction,
    pub iterations: u32,
    pub salt: Vec<u8>,
    pub subkey: Vec<u8>,
}

impl Envelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.salt.len() + self.subkey.len());
        bytes.push(FORMAT_MARKER);
        bytes.extend_from_slice(&self.hash_function.id().to_be_bytes());
        bytes.extend_from_slice(&self.iterations.to_be_bytes());
        bytes.extend_from_slice(&(self.salt.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.subkey);
        bytes
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse raw envelope bytes.
    ///
    /// # Errors
    /// * `Truncated` - Header or declared salt extends past the end
    /// * `UnknownFormat` - First byte is not the format marker
    /// * `UnknownHashFunction` - Hash function id is not recognised
    /// * `ZeroIterations` - Iteration count is zero
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.len() < HEADER_LEN {
            return Err(EnvelopeError::Truncated);
        }

        if bytes[0] != FORMAT_MARKER {
            return Err(EnvelopeError::UnknownFormat(bytes[0]));
        }

        let hash_function = HashFunction::try_from(read_u32(bytes, 1))?;

        let iterations = read_u32(bytes, 5);
        if iterations == 0 {
            return Err(EnvelopeError::ZeroIterations);
        }

        let salt_len = read_u32(bytes, 9) as usize;
        let salt_end = HEADER_LEN
            .checked_add(salt_len)
            .filter(|&end| end <= bytes.len())
            .ok_or(EnvelopeError::Truncated)?;

        Ok(Self {
            hash_function,
            iterations,
            salt: bytes[HEADER_LEN..salt_end].to_vec(),
            subkey: bytes[salt_end..].to_vec(),
        })
    }

    /// Decode a base64 envelope string.
    pub fn decode(encoded: &str) -> Result<Self, EnvelopeError> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| EnvelopeError::Encoding)?;
        Self::from_bytes(&bytes)
    }
}

/// Caller guarantees `offset + 4 <= buffer.len()`.
fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

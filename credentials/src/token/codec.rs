//! Three-segment token wire format.
//!
//! `base64url(header) "." base64url(payload) "." base64url(signature)`, all
//! segments unpadded. Scanning works on raw bytes so the signed prefix can be
//! hashed as-is without re-encoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;

use super::claims::Claims;
use super::errors::MalformedToken;
use super::errors::TokenError;

pub const SEPARATOR: u8 = b'.';

/// Algorithm label written into every header. Informational only: the
/// verifying algorithm is fixed by the signing backend.
pub const HEADER_ALGORITHM: &str = "RSA256";
pub const HEADER_TYPE: &str = "JWT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    pub typ: String,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            alg: HEADER_ALGORITHM.to_string(),
            typ: HEADER_TYPE.to_string(),
        }
    }
}

/// Result of a successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    /// Length of the `header.payload` prefix covered by the signature.
    pub signed_len: usize,
    pub signature: Vec<u8>,
}

/// Encode the signed prefix `header.payload`.
///
/// The returned buffer has spare capacity for a separator and an encoded
/// signature of `signature_len` bytes, so appending it does not reallocate.
///
/// # Errors
/// * `EncodingFailed` - A number claim is NaN or infinite (JSON would carry
///   it as `null`, and the token could never verify), or serialization failed
pub fn encode(header: &Header, claims: &Claims, signature_len: usize) -> Result<String, TokenError> {
    if let Some((name, _)) = claims
        .iter()
        .find(|(_, value)| value.as_number().is_some_and(|n| !n.is_finite()))
    {
        return Err(TokenError::EncodingFailed(format!(
            "claim {} is not a finite number",
            name
        )));
    }

    let header_json =
        serde_json::to_vec(header).map_err(|e| TokenError::EncodingFailed(e.to_string()))?;
    let payload_json =
        serde_json::to_vec(claims).map_err(|e| TokenError::EncodingFailed(e.to_string()))?;

    let capacity = encoded_len(header_json.len())
        + 1
        + encoded_len(payload_json.len())
        + 1
        + encoded_len(signature_len);

    let mut prefix = String::with_capacity(capacity);
    URL_SAFE_NO_PAD.encode_string(&header_json, &mut prefix);
    prefix.push(SEPARATOR as char);
    URL_SAFE_NO_PAD.encode_string(&payload_json, &mut prefix);

    Ok(prefix)
}

/// Append `.signature` to an encoded prefix.
pub fn append_signature(prefix: &mut String, signature: &[u8]) {
    prefix.push(SEPARATOR as char);
    URL_SAFE_NO_PAD.encode_string(signature, prefix);
}

/// Locate the signed prefix and decode the signature of untrusted token bytes.
///
/// # Errors
/// * `Structure` - Not exactly three segments
/// * `Header` - Header segment is not valid base64url
/// * `Signature` - Signature segment is not valid base64url
pub fn scan(token: &[u8]) -> Result<Scanned, MalformedToken> {
    let first = token
        .iter()
        .position(|&b| b == SEPARATOR)
        .ok_or(MalformedToken::Structure)?;
    let last = token
        .iter()
        .rposition(|&b| b == SEPARATOR)
        .ok_or(MalformedToken::Structure)?;

    if last <= first || token[first + 1..last].contains(&SEPARATOR) {
        return Err(MalformedToken::Structure);
    }

    URL_SAFE_NO_PAD
        .decode(&token[..first])
        .map_err(|_| MalformedToken::Header)?;

    let signature = URL_SAFE_NO_PAD
        .decode(&token[last + 1..])
        .map_err(|_| MalformedToken::Signature)?;

    Ok(Scanned {
        signed_len: last,
        signature,
    })
}

/// Decode the payload segment of token bytes into claims.
///
/// Does not check the signature.
pub fn decode_payload(token: &[u8]) -> Result<Claims, MalformedToken> {
    let mut segments = token.split(|&b| b == SEPARATOR);
    let payload = segments
        .nth(1)
        .ok_or(MalformedToken::Structure)?;

    let json = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| MalformedToken::Payload)?;

    serde_json::from_slice(&json).map_err(|_| MalformedToken::Payload)
}

fn encoded_len(len: usize) -> usize {
    base64::encoded_len(len, false).unwrap_or(0)
}

use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::envelope::Envelope;
use super::envelope::HashFunction;
use super::errors::EnvelopeError;
use super::errors::PasswordError;

/// Key derivation parameters.
///
/// `salt_size` and `key_size` are also the minimums a stored envelope must
/// meet to be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherOptions {
    pub iterations: u32,
    /// Salt length in bytes.
    pub salt_size: usize,
    /// Derived key length in bytes.
    pub key_size: usize,
    pub hash_function: HashFunction,
    /// Highest iteration count a stored envelope may declare.
    pub max_iterations: u32,
}

impl Default for HasherOptions {
    fn default() -> Self {
        Self {
            iterations: 15_000,
            salt_size: 128 / 8,
            key_size: 256 / 8,
            hash_function: HashFunction::HmacSha256,
            max_iterations: 1_000_000,
        }
    }
}

/// PBKDF2 password hasher with a versioned envelope.
///
/// Derivation is CPU-bound and takes tens of milliseconds at the default
/// iteration count; async callers should move it off the reactor.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    options: HasherOptions,
}

impl PasswordHasher {
    pub fn new(options: HasherOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &HasherOptions {
        &self.options
    }

    /// Hash a plaintext password with a fresh random salt.
    ///
    /// # Returns
    /// Base64 envelope carrying the parameters, salt and derived key
    ///
    /// # Errors
    /// * `HashingFailed` - Key derivation failed, or `iterations` exceeds
    ///   `max_iterations` (the envelope could never be verified)
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if self.options.iterations > self.options.max_iterations {
            return Err(PasswordError::HashingFailed(format!(
                "iterations {} exceed the maximum of {}",
                self.options.iterations, self.options.max_iterations
            )));
        }

        let mut salt = vec![0u8; self.options.salt_size];
        OsRng.fill_bytes(&mut salt);

        let mut subkey = vec![0u8; self.options.key_size];
        derive(
            self.options.hash_function,
            password.as_bytes(),
            &salt,
            self.options.iterations,
            &mut subkey,
        )
        .map_err(PasswordError::HashingFailed)?;

        let envelope = Envelope {
            hash_function: self.options.hash_function,
            iterations: self.options.iterations,
            salt,
            subkey,
        };

        Ok(envelope.encode())
    }

    /// Verify a plaintext password against a stored envelope.
    ///
    /// Never fails: an unreadable, truncated or unknown-algorithm envelope is
    /// simply not a match.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match self.check(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected password hash");
                false
            }
        }
    }

    fn check(&self, password: &str, hash: &str) -> Result<bool, EnvelopeError> {
        let envelope = Envelope::decode(hash)?;

        // A shortened envelope must not weaken the comparison.
        if envelope.salt.len() < self.options.salt_size
            || envelope.subkey.len() < self.options.key_size
        {
            return Err(EnvelopeError::Truncated);
        }

        if envelope.iterations > self.options.max_iterations {
            return Err(EnvelopeError::TooManyIterations {
                iterations: envelope.iterations,
                max: self.options.max_iterations,
            });
        }

        let mut actual = vec![0u8; envelope.subkey.len()];
        if let Err(e) = derive(
            envelope.hash_function,
            password.as_bytes(),
            &envelope.salt,
            envelope.iterations,
            &mut actual,
        ) {
            tracing::error!(error = %e, "Password key derivation failed");
            return Ok(false);
        }

        Ok(actual.ct_eq(&envelope.subkey).into())
    }
}

fn derive(
    hash_function: HashFunction,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    out: &mut [u8],
) -> Result<(), String> {
    let result = match hash_function {
        HashFunction::HmacSha256 => pbkdf2::<Hmac<Sha256>>(password, salt, iterations, out),
        HashFunction::HmacSha512 => pbkdf2::<Hmac<Sha512>>(password, salt, iterations, out),
    };

    result.map_err(|e| format!("PBKDF2 failed: {}", e))
}

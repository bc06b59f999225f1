//! Credential security library
//!
//! Provides the two credential primitives services build authentication on:
//! - Signed tokens: a three-segment `header.payload.signature` format signed
//!   over a SHA-512 digest by a pluggable backend (in-process RSA key or a
//!   remote key-management service)
//! - Password hashing: PBKDF2 with a random salt, stored in a versioned
//!   envelope and compared in constant time
//! - Password composition policy
//! - Authentication coordination (login, password change and reset, scope checks)
//!
//! Verification is total: malformed or hostile input yields `false` (or
//! `Unauthorized`), never a panic or an error describing what was wrong.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use credentials::{PasswordHasher, PasswordPolicy};
//!
//! let policy = PasswordPolicy::default();
//! policy.validate("Password1234").unwrap();
//! assert!(policy.validate("password").is_err());
//!
//! let hasher = PasswordHasher::default();
//! let hash = hasher.hash("Password1234").unwrap();
//! assert!(hasher.verify("Password1234", &hash));
//! assert!(!hasher.verify("Password12345", &hash));
//! ```
//!
//! ## Tokens
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use credentials::{KeyRef, RsaSigner, TokenService};
//!
//! # async fn run(pem: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let key = KeyRef::new("alias/distro-jwt");
//! let signer = RsaSigner::from_pem(key.clone(), pem)?;
//! let service = TokenService::new(Arc::new(signer), key);
//!
//! let token = service
//!     .new_token()
//!     .add_claim("uid", "42")
//!     .set_expiry(Utc::now() + Duration::hours(1))
//!     .build()
//!     .await?;
//!
//! assert!(service.verify_token(token.as_bytes()).await);
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod clock;
pub mod password;
pub mod signing;
pub mod token;

// Re-export commonly used items
pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::Principal;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use password::HashFunction;
pub use password::HasherOptions;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use password::PolicyOptions;
pub use password::PolicyViolation;
pub use signing::KeyRef;
pub use signing::RsaSigner;
pub use signing::Signer;
pub use signing::SigningBackend;
pub use signing::SigningError;
pub use token::AccessToken;
pub use token::AuthorizationError;
pub use token::Claims;
pub use token::Token;
pub use token::TokenError;
pub use token::TokenService;

use chrono::Duration;
use rand::rngs::OsRng;
use rand::Rng;

use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::password::PasswordPolicy;
use crate::password::PolicyViolation;
use crate::signing::SigningBackend;
use crate::token::claims::CLAIM_EMAIL;
use crate::token::claims::CLAIM_SCOPES;
use crate::token::claims::CLAIM_USER_ID;
use crate::token::AccessToken;
use crate::token::AuthorizationError;
use crate::token::Token;
use crate::token::TokenError;
use crate::token::TokenService;

const RESET_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@#*&!?$";
const RESET_LENGTH: usize = 12;
const RESET_ATTEMPTS: usize = 64;

/// Identity a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
    pub scopes: Vec<String>,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// Covers unknown users, wrong passwords and unreadable stored hashes alike.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Policy(#[from] PolicyViolation),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Authentication coordinator combining password handling and token issuance.
pub struct Authenticator<S>
where
    S: SigningBackend,
{
    policy: PasswordPolicy,
    hasher: PasswordHasher,
    tokens: TokenService<S>,
    token_ttl: Duration,
}

impl<S> Authenticator<S>
where
    S: SigningBackend,
{
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `tokens` - Token service used to issue and verify access tokens
    /// * `hasher` - Password hasher
    /// * `policy` - Composition rules for new passwords
    /// * `token_ttl` - Lifetime of issued access tokens
    pub fn new(
        tokens: TokenService<S>,
        hasher: PasswordHasher,
        policy: PasswordPolicy,
        token_ttl: Duration,
    ) -> Self {
        Self {
            policy,
            hasher,
            tokens,
            token_ttl,
        }
    }

    pub fn tokens(&self) -> &TokenService<S> {
        &self.tokens
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Validate and hash a new password for storage.
    ///
    /// # Errors
    /// * `Policy` - Password fails a composition rule
    /// * `Password` - Hashing failed
    pub fn hash_password(&self, password: &str) -> Result<String, AuthenticationError> {
        self.policy.validate(password)?;
        Ok(self.hasher.hash(password)?)
    }

    /// Verify credentials and issue an access token.
    ///
    /// The token is valid from now until now + ttl and carries the
    /// principal's user id, email and scopes.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match the stored hash
    /// * `Token` - Token could not be signed
    pub async fn authenticate(
        &self,
        password: &str,
        stored_hash: &str,
        principal: &Principal,
    ) -> Result<AccessToken, AuthenticationError> {
        if !self.hasher.verify(password, stored_hash) {
            tracing::debug!(user_id = %principal.user_id, "Authentication failed");
            return Err(AuthenticationError::InvalidCredentials);
        }

        let now = self.tokens.now();
        let expires = now.checked_add_signed(self.token_ttl).ok_or_else(|| {
            TokenError::EncodingFailed("token expiry is out of range".to_string())
        })?;

        let token = self
            .tokens
            .new_token()
            .set_not_before(now)
            .set_issued_at(now)
            .set_expiry(expires)
            .add_claim(CLAIM_USER_ID, principal.user_id.as_str())
            .add_claim(CLAIM_EMAIL, principal.email.as_str())
            .add_claim(CLAIM_SCOPES, principal.scopes.clone())
            .build()
            .await?;

        tracing::info!(user_id = %principal.user_id, "Access token issued");

        Ok(AccessToken::new(&token, expires))
    }

    /// Replace a password after checking the current one.
    ///
    /// # Returns
    /// Envelope for the new password
    ///
    /// # Errors
    /// * `InvalidCredentials` - Current password does not match
    /// * `Policy` - New password fails a composition rule
    pub fn change_password(
        &self,
        current: &str,
        stored_hash: &str,
        new: &str,
    ) -> Result<String, AuthenticationError> {
        if !self.hasher.verify(current, stored_hash) {
            return Err(AuthenticationError::InvalidCredentials);
        }

        self.hash_password(new)
    }

    /// Generate a random password that satisfies the policy.
    ///
    /// # Returns
    /// The plaintext, to hand to the user once, and its envelope
    ///
    /// # Errors
    /// * `Policy` - The policy cannot be met by generated passwords
    pub fn reset_password(&self) -> Result<(String, String), AuthenticationError> {
        let length = RESET_LENGTH.max(self.policy.options().required_length);
        let mut violation = PolicyViolation::Required;

        for _ in 0..RESET_ATTEMPTS {
            let candidate: String = (0..length)
                .map(|_| RESET_ALPHABET[OsRng.gen_range(0..RESET_ALPHABET.len())] as char)
                .collect();

            match self.policy.validate(&candidate) {
                Ok(()) => {
                    let hash = self.hasher.hash(&candidate)?;
                    return Ok((candidate, hash));
                }
                Err(e) => violation = e,
            }
        }

        Err(AuthenticationError::Policy(violation))
    }

    /// Authorize a request from its `Authorization` header.
    ///
    /// # Errors
    /// * `Unauthorized` - Header missing the `Bearer` scheme, or the token is invalid
    /// * `Forbidden` - Token carries none of `scopes`
    pub async fn authorize(
        &self,
        authorization: &str,
        scopes: &[&str],
    ) -> Result<Token, AuthorizationError> {
        let token = bearer_token(authorization).ok_or(AuthorizationError::Unauthorized)?;
        self.tokens.verify_with_scopes(token.as_bytes(), scopes).await
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

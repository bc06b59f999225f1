use std::collections::HashSet;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use sha2::Digest;
use sha2::Sha512;

use super::claims::ClaimValue;
use super::claims::Claims;
use super::claims::CLAIM_EXPIRY;
use super::claims::CLAIM_ISSUED_AT;
use super::claims::CLAIM_NOT_BEFORE;
use super::claims::CLAIM_SCOPES;
use super::codec;
use super::codec::Header;
use super::errors::AuthorizationError;
use super::errors::TokenError;
use super::signed::Token;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::signing::KeyRef;
use crate::signing::SigningBackend;

/// Issues and verifies signed tokens.
///
/// Holds no mutable state: the backend handle, key reference and clock are
/// fixed at construction, so one instance can serve concurrent requests.
pub struct TokenService<S>
where
    S: SigningBackend,
{
    backend: Arc<S>,
    key: KeyRef,
    clock: Arc<dyn Clock>,
}

impl<S> TokenService<S>
where
    S: SigningBackend,
{
    /// Create a token service using the system clock.
    ///
    /// # Arguments
    /// * `backend` - Signing backend
    /// * `key` - Key passed to the backend on every sign and verify call
    pub fn new(backend: Arc<S>, key: KeyRef) -> Self {
        Self {
            backend,
            key,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for issuance and expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &KeyRef {
        &self.key
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start building a new token.
    pub fn new_token(&self) -> TokenBuilder<'_, S> {
        TokenBuilder {
            service: self,
            claims: Claims::new(),
        }
    }

    /// Check a token's signature and time window.
    ///
    /// Total over arbitrary input: malformed bytes, bad signatures, expired or
    /// not-yet-valid tokens and backend failures all yield `false`.
    pub async fn verify_token(&self, token: &[u8]) -> bool {
        let scanned = match codec::scan(token) {
            Ok(scanned) => scanned,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected token");
                return false;
            }
        };

        let digest = Sha512::digest(&token[..scanned.signed_len]);

        match self
            .backend
            .verify(&self.key, &digest, &scanned.signature)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Rejected token: signature mismatch");
                return false;
            }
            Err(e) => {
                tracing::error!(key_id = %self.key, error = %e, "Token verification failed");
                return false;
            }
        }

        let claims = match codec::decode_payload(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Rejected token");
                return false;
            }
        };

        let now = self.clock.now().timestamp_millis() as f64;
        let expiry = time_claim(&claims, CLAIM_EXPIRY);
        let not_before = time_claim(&claims, CLAIM_NOT_BEFORE);

        match (expiry, not_before) {
            (Ok(exp), Ok(nbf)) => {
                let within = exp.map_or(true, |exp| exp > now) && nbf.map_or(true, |nbf| nbf <= now);
                if !within {
                    tracing::debug!("Rejected token: outside validity window");
                }
                within
            }
            _ => {
                tracing::debug!("Rejected token: non-numeric time claim");
                false
            }
        }
    }

    /// Verify a token, then require at least one of `scopes` in its scope claim.
    ///
    /// # Returns
    /// The verified token
    ///
    /// # Errors
    /// * `Unauthorized` - Token failed signature or time checks
    /// * `Forbidden` - Token is valid but carries none of the required scopes
    pub async fn verify_with_scopes(
        &self,
        token: &[u8],
        scopes: &[&str],
    ) -> Result<Token, AuthorizationError> {
        if !self.verify_token(token).await {
            return Err(AuthorizationError::Unauthorized);
        }

        let token = Token::from(token);
        let granted = token.strings(CLAIM_SCOPES).unwrap_or_default();
        let required: HashSet<&str> = scopes.iter().copied().collect();

        if granted.iter().any(|scope| required.contains(scope.as_str())) {
            Ok(token)
        } else {
            tracing::debug!(required = ?scopes, granted = ?granted, "Token lacks required scope");
            Err(AuthorizationError::Forbidden)
        }
    }
}

/// A present-but-non-numeric time claim is an error, absence is `Ok(None)`.
fn time_claim(claims: &Claims, name: &str) -> Result<Option<f64>, ()> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value.as_number().map(Some).ok_or(()),
    }
}

/// Accumulates claims for a token.
///
/// Setting a claim that already exists overrides its value.
pub struct TokenBuilder<'a, S>
where
    S: SigningBackend,
{
    service: &'a TokenService<S>,
    claims: Claims,
}

impl<'a, S> TokenBuilder<'a, S>
where
    S: SigningBackend,
{
    pub fn add_claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.claims.insert(name, value);
        self
    }

    pub fn add_claims(mut self, claims: Claims) -> Self {
        for (name, value) in claims.iter() {
            self.claims.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set `exp`, stored as milliseconds since the epoch.
    pub fn set_expiry(self, at: DateTime<Utc>) -> Self {
        self.add_claim(CLAIM_EXPIRY, at)
    }

    /// Set `iat`, stored as milliseconds since the epoch.
    pub fn set_issued_at(self, at: DateTime<Utc>) -> Self {
        self.add_claim(CLAIM_ISSUED_AT, at)
    }

    /// Set `nbf`, stored as milliseconds since the epoch.
    pub fn set_not_before(self, at: DateTime<Utc>) -> Self {
        self.add_claim(CLAIM_NOT_BEFORE, at)
    }

    /// Encode and sign the token.
    ///
    /// # Errors
    /// * `EncodingFailed` - Claims could not be serialized
    /// * `SigningFailed` - The backend could not resolve the key or refused the digest
    pub async fn build(self) -> Result<Token, TokenError> {
        let service = self.service;
        let backend = &service.backend;

        let mut token = codec::encode(
            &Header::default(),
            &self.claims,
            backend.max_signature_len(),
        )?;

        let digest = Sha512::digest(token.as_bytes());

        let signature = backend
            .sign(&service.key, &digest)
            .await
            .map_err(|e| {
                tracing::error!(key_id = %service.key, error = %e, "Token signing failed");
                TokenError::from(e)
            })?;

        codec::append_signature(&mut token, &signature);

        tracing::debug!(key_id = %service.key, claims = self.claims.len(), "Token issued");

        Ok(Token::from(token))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use mockall::mock;

    use super::*;
    use crate::clock::ManualClock;
    use crate::signing::local::tests::test_signer;
    use crate::signing::RsaSigner;
    use crate::signing::SigningError;
    use crate::token::claims::CLAIM_USER_ID;
    use crate::token::claims::SCOPE_USERS_READ;
    use crate::token::claims::SCOPE_USERS_WRITE;
    use crate::token::errors::MalformedToken;

    mock! {
        pub TestSigningBackend {}

        #[async_trait]
        impl SigningBackend for TestSigningBackend {
            async fn sign(&self, key: &KeyRef, digest: &[u8]) -> Result<Vec<u8>, SigningError>;
            async fn verify(
                &self,
                key: &KeyRef,
                digest: &[u8],
                signature: &[u8],
            ) -> Result<bool, SigningError>;
        }
    }

    fn service() -> TokenService<RsaSigner> {
        TokenService::new(Arc::new(test_signer()), KeyRef::new("alias/test-jwt"))
    }

    fn service_at(clock: Arc<ManualClock>) -> TokenService<RsaSigner> {
        service().with_clock(clock)
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[tokio::test]
    async fn test_build_and_verify() {
        let service = service();

        let token = service
            .new_token()
            .set_expiry(Utc::now() + Duration::hours(1))
            .add_claim(CLAIM_USER_ID, "139721")
            .add_claim("name", "John Doe")
            .build()
            .await
            .expect("Failed to build token");

        assert!(service.verify_token(token.as_bytes()).await);
        assert_eq!(token.as_bytes().iter().filter(|&&b| b == b'.').count(), 2);
    }

    #[tokio::test]
    async fn test_token_without_time_claims_verifies() {
        let service = service();
        let token = service.new_token().add_claim("id", 5).build().await.unwrap();

        assert!(service.verify_token(token.as_bytes()).await);
        assert_eq!(token.number("id"), Some(5.0));
        assert_eq!(token.number("age"), None);
    }

    #[tokio::test]
    async fn test_unknown_key_builds_nothing() {
        let service = TokenService::new(Arc::new(test_signer()), KeyRef::new("some random key id"));

        let result = service.new_token().add_claim("id", 5).build().await;
        assert!(matches!(
            result,
            Err(TokenError::SigningFailed(SigningError::KeyNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_expiry_window() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = service_at(clock.clone());

        let expired = service
            .new_token()
            .set_expiry(start() - Duration::milliseconds(1))
            .build()
            .await
            .unwrap();
        assert!(!service.verify_token(expired.as_bytes()).await);

        let exactly_now = service.new_token().set_expiry(start()).build().await.unwrap();
        assert!(!service.verify_token(exactly_now.as_bytes()).await);

        let valid = service
            .new_token()
            .set_expiry(start() + Duration::hours(1))
            .build()
            .await
            .unwrap();
        assert!(service.verify_token(valid.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_not_before_window() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = service_at(clock.clone());

        let early = service
            .new_token()
            .set_not_before(start() + Duration::hours(1))
            .build()
            .await
            .unwrap();
        assert!(!service.verify_token(early.as_bytes()).await);

        let past = service
            .new_token()
            .set_not_before(start() - Duration::milliseconds(1))
            .build()
            .await
            .unwrap();
        assert!(service.verify_token(past.as_bytes()).await);

        let exactly_now = service.new_token().set_not_before(start()).build().await.unwrap();
        assert!(service.verify_token(exactly_now.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_token_expires_as_clock_advances() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = service_at(clock.clone());

        let token = service
            .new_token()
            .add_claim(CLAIM_USER_ID, "42")
            .set_expiry(start() + Duration::seconds(60))
            .build()
            .await
            .unwrap();

        assert!(service.verify_token(token.as_bytes()).await);

        clock.advance(Duration::seconds(61));
        assert!(!service.verify_token(token.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_time_claims_are_milliseconds() {
        let service = service();
        let at = start() + Duration::milliseconds(123);

        let token = service
            .new_token()
            .set_expiry(at)
            .set_issued_at(at)
            .set_not_before(at)
            .build()
            .await
            .unwrap();

        let expected = at.timestamp_millis() as f64;
        assert_eq!(token.number(CLAIM_EXPIRY), Some(expected));
        assert_eq!(token.number(CLAIM_ISSUED_AT), Some(expected));
        assert_eq!(token.number(CLAIM_NOT_BEFORE), Some(expected));
    }

    #[tokio::test]
    async fn test_non_numeric_expiry_is_rejected() {
        let service = service();
        let token = service
            .new_token()
            .add_claim(CLAIM_EXPIRY, "tomorrow")
            .build()
            .await
            .unwrap();

        assert!(!service.verify_token(token.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_flipped_signature_byte_is_rejected() {
        let service = service();
        let token = service
            .new_token()
            .set_expiry(Utc::now() + Duration::hours(1))
            .build()
            .await
            .unwrap();

        let bytes = token.as_bytes();
        let signature_start = bytes.iter().rposition(|&b| b == b'.').unwrap() + 1;

        for i in signature_start..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] ^= 0x01;
            assert!(
                !service.verify_token(&tampered).await,
                "flipping byte {} still verified",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_tampered_payload_is_rejected() {
        let service = service();
        let token = service.new_token().add_claim("id", 5).build().await.unwrap();

        let original = String::from_utf8(token.into_bytes()).unwrap();
        let segments: Vec<&str> = original.split('.').collect();

        let mut forged_claims = Claims::new();
        forged_claims.insert("id", 6);
        let forged_payload = codec::encode(&Header::default(), &forged_claims, 0).unwrap();
        let forged_payload = forged_payload.split('.').nth(1).unwrap();

        let forged = format!("{}.{}.{}", segments[0], forged_payload, segments[2]);
        assert!(!service.verify_token(forged.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_malformed_tokens_are_rejected() {
        let service = service();
        let token = service.new_token().add_claim("id", 5).build().await.unwrap();
        let bytes = token.as_bytes();

        // Deformed header
        assert!(!service.verify_token(&bytes[1..]).await);

        // Truncated signature
        assert!(!service.verify_token(&bytes[..bytes.len() - 1]).await);

        // Header removed
        let first = bytes.iter().position(|&b| b == b'.').unwrap();
        assert!(!service.verify_token(&bytes[first + 1..]).await);

        assert!(!service.verify_token(b"").await);
        assert!(!service.verify_token(b"no-separators").await);
        assert!(!service.verify_token(b"one.separator").await);
        assert!(!service.verify_token(b"..").await);
        assert!(!service.verify_token(&[0xff, b'.', 0xfe, b'.', 0xfd]).await);
    }

    #[tokio::test]
    async fn test_verify_with_scopes() {
        let service = service();
        let scopes: &[&str] = &[SCOPE_USERS_READ];
        let token = service
            .new_token()
            .add_claim(CLAIM_SCOPES, scopes)
            .set_expiry(Utc::now() + Duration::hours(1))
            .build()
            .await
            .unwrap();

        let result = service
            .verify_with_scopes(token.as_bytes(), &[SCOPE_USERS_WRITE])
            .await;
        assert_eq!(result, Err(AuthorizationError::Forbidden));

        let verified = service
            .verify_with_scopes(token.as_bytes(), &[SCOPE_USERS_READ])
            .await
            .expect("Expected scope to be granted");
        assert_eq!(verified, token);

        let any_of = service
            .verify_with_scopes(token.as_bytes(), &[SCOPE_USERS_WRITE, SCOPE_USERS_READ])
            .await;
        assert!(any_of.is_ok());
    }

    #[tokio::test]
    async fn test_verify_with_scopes_distinguishes_unauthorized() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = service_at(clock.clone());
        let scopes: &[&str] = &[SCOPE_USERS_READ];

        let token = service
            .new_token()
            .add_claim(CLAIM_SCOPES, scopes)
            .set_expiry(start() + Duration::seconds(60))
            .build()
            .await
            .unwrap();

        clock.advance(Duration::seconds(61));

        let result = service
            .verify_with_scopes(token.as_bytes(), &[SCOPE_USERS_READ])
            .await;
        assert_eq!(result, Err(AuthorizationError::Unauthorized));

        let result = service.verify_with_scopes(b"garbage", &[SCOPE_USERS_READ]).await;
        assert_eq!(result, Err(AuthorizationError::Unauthorized));
    }

    #[tokio::test]
    async fn test_verify_with_scopes_missing_claim() {
        let service = service();
        let token = service.new_token().add_claim(CLAIM_SCOPES, "users:read").build().await.unwrap();

        // A string instead of a list grants nothing
        let result = service
            .verify_with_scopes(token.as_bytes(), &[SCOPE_USERS_READ])
            .await;
        assert_eq!(result, Err(AuthorizationError::Forbidden));
    }

    #[tokio::test]
    async fn test_backend_sign_failure() {
        let mut backend = MockTestSigningBackend::new();
        backend
            .expect_sign()
            .times(1)
            .returning(|_, _| Err(SigningError::Transport("timeout".to_string())));

        let service = TokenService::new(Arc::new(backend), KeyRef::new("alias/distro-jwt"));
        let result = service.new_token().add_claim("id", 5).build().await;

        assert!(matches!(
            result,
            Err(TokenError::SigningFailed(SigningError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_non_finite_claim_builds_nothing() {
        let mut backend = MockTestSigningBackend::new();
        backend.expect_sign().times(0);

        let service = TokenService::new(Arc::new(backend), KeyRef::new("alias/distro-jwt"));
        let result = service
            .new_token()
            .add_claim(CLAIM_USER_ID, "139721")
            .add_claim("score", f64::NAN)
            .build()
            .await;

        assert!(matches!(result, Err(TokenError::EncodingFailed(_))));
    }

    #[tokio::test]
    async fn test_backend_receives_digest_of_prefix() {
        let mut backend = MockTestSigningBackend::new();
        backend
            .expect_sign()
            .withf(|key, digest| key.as_str() == "alias/distro-jwt" && digest.len() == 64)
            .times(1)
            .returning(|_, _| Ok(vec![0xAB; 16]));
        backend
            .expect_verify()
            .withf(|key, digest, signature| {
                key.as_str() == "alias/distro-jwt" && digest.len() == 64 && signature.to_vec() == vec![0xAB; 16]
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let service = TokenService::new(Arc::new(backend), KeyRef::new("alias/distro-jwt"));
        let token = service.new_token().add_claim("id", 5).build().await.unwrap();

        assert!(service.verify_token(token.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_backend_verify_failure_is_false() {
        let mut backend = MockTestSigningBackend::new();
        backend
            .expect_sign()
            .returning(|_, _| Ok(vec![1, 2, 3]));
        backend
            .expect_verify()
            .times(1)
            .returning(|_, _, _| Err(SigningError::Transport("connection refused".to_string())));

        let service = TokenService::new(Arc::new(backend), KeyRef::new("alias/distro-jwt"));
        let token = service.new_token().build().await.unwrap();

        assert!(!service.verify_token(token.as_bytes()).await);
    }

    #[tokio::test]
    async fn test_structural_failures_skip_backend() {
        let mut backend = MockTestSigningBackend::new();
        backend.expect_verify().times(0);

        let service = TokenService::new(Arc::new(backend), KeyRef::new("alias/distro-jwt"));
        assert!(!service.verify_token(b"abc.def").await);
        assert_eq!(codec::scan(b"abc.def"), Err(MalformedToken::Structure));
    }
}

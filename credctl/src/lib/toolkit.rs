use std::fs;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::Duration;
use credentials::signing::HttpKeyManagementClient;
use credentials::signing::RemoteSigner;
use credentials::Authenticator;
use credentials::KeyRef;
use credentials::PasswordHasher;
use credentials::PasswordPolicy;
use credentials::RsaSigner;
use credentials::Signer;
use credentials::TokenService;

use crate::config::Config;
use crate::config::SignerConfig;
use crate::config::TokenConfig;

/// Everything a command needs, assembled once from configuration.
pub struct Toolkit {
    pub policy: PasswordPolicy,
    pub hasher: PasswordHasher,
    /// Present only when a `token` section is configured.
    pub authenticator: Option<Authenticator<Signer>>,
}

impl Toolkit {
    /// Build the toolkit from configuration.
    ///
    /// # Errors
    /// The configured signing key cannot be read or parsed, or the
    /// key-management client cannot be created
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let policy = PasswordPolicy::new(config.policy.clone());
        let hasher = PasswordHasher::new(config.password.clone());

        let authenticator = match &config.token {
            Some(token) => {
                let ttl = Duration::try_seconds(token.ttl_seconds).with_context(|| {
                    format!("token.ttl_seconds = {} is out of range", token.ttl_seconds)
                })?;
                let tokens = TokenService::new(
                    Arc::new(build_signer(token)?),
                    KeyRef::new(token.key_id.clone()),
                );
                Some(Authenticator::new(
                    tokens,
                    hasher.clone(),
                    policy.clone(),
                    ttl,
                ))
            }
            None => None,
        };

        Ok(Self {
            policy,
            hasher,
            authenticator,
        })
    }

    /// The authenticator, or an error explaining that token signing is not configured.
    pub fn authenticator(&self) -> anyhow::Result<&Authenticator<Signer>> {
        self.authenticator
            .as_ref()
            .context("token signing is not configured (missing [token] section)")
    }
}

/// Construct the signing backend selected in configuration.
pub fn build_signer(config: &TokenConfig) -> anyhow::Result<Signer> {
    let key = KeyRef::new(config.key_id.clone());

    match &config.signer {
        SignerConfig::Local { private_key_path } => {
            let pem = fs::read_to_string(private_key_path)
                .with_context(|| format!("failed to read signing key {}", private_key_path))?;
            let signer = RsaSigner::from_pem(key, &pem)
                .with_context(|| format!("failed to load signing key {}", private_key_path))?;

            tracing::info!(key_id = %config.key_id, signer = "local", "Signing backend ready");
            Ok(Signer::Local(signer))
        }
        SignerConfig::Remote {
            endpoint,
            timeout_ms,
            max_signature_len,
        } => {
            let client =
                HttpKeyManagementClient::new(endpoint.clone(), StdDuration::from_millis(*timeout_ms))
                    .context("failed to create key-management client")?;

            tracing::info!(
                key_id = %config.key_id,
                signer = "remote",
                endpoint = %endpoint,
                "Signing backend ready"
            );
            Ok(Signer::Remote(RemoteSigner::new(client, *max_signature_len)))
        }
    }
}

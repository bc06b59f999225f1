use std::io::BufRead;

use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use clap::Subcommand;
use credentials::token::claims::CLAIM_EMAIL;
use credentials::token::claims::CLAIM_SCOPES;
use credentials::token::claims::CLAIM_USER_ID;
use credentials::AccessToken;
use credentials::AuthenticationError;
use credentials::AuthorizationError;
use credentials::Principal;

use crate::toolkit::Toolkit;

/// Credential tooling: hash and check passwords, issue and verify tokens.
#[derive(Debug, Parser)]
#[command(name = "credctl", version)]
pub struct Cli {
    /// Configuration file layered over config/default and config/{RUN_MODE}
    #[arg(long, short, global = true, env = "CREDCTL_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Passwords given as `None` are read from the first line of stdin.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a password against the policy and print its hash envelope
    HashPassword { password: Option<String> },

    /// Check a password against a stored hash envelope
    VerifyPassword {
        #[arg(long)]
        hash: String,
        password: Option<String>,
    },

    /// Check a password against the composition policy
    ValidatePassword { password: Option<String> },

    /// Check a password against a stored hash and issue an access token
    Login {
        #[arg(long)]
        hash: String,
        #[arg(long)]
        uid: String,
        #[arg(long)]
        email: String,
        #[arg(long = "scope")]
        scopes: Vec<String>,
        password: Option<String>,
    },

    /// Issue an access token without a password check
    IssueToken {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long = "scope")]
        scopes: Vec<String>,
        /// Overrides the configured token lifetime
        #[arg(long)]
        ttl_seconds: Option<i64>,
    },

    /// Verify a token, optionally requiring one of the given scopes
    VerifyToken {
        token: String,
        #[arg(long = "scope")]
        scopes: Vec<String>,
    },
}

/// Result of a command: what to print and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    pub success: bool,
}

impl Outcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
        }
    }
}

/// Use the given password, or read one line from `input`.
pub fn resolve_password(password: Option<String>, input: &mut impl BufRead) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Execute a command.
///
/// # Errors
/// Operational failures only (unreadable input, signing backend down,
/// missing configuration). Rejected passwords and tokens are an unsuccessful
/// [`Outcome`], not an error.
pub async fn run(
    command: Command,
    toolkit: &Toolkit,
    input: &mut impl BufRead,
) -> anyhow::Result<Outcome> {
    match command {
        Command::HashPassword { password } => {
            let password = resolve_password(password, input)?;
            if let Err(violation) = toolkit.policy.validate(&password) {
                return Ok(Outcome::failed(violation.to_string()));
            }

            let hash = toolkit.hasher.hash(&password)?;
            Ok(Outcome::ok(hash))
        }

        Command::VerifyPassword { hash, password } => {
            let password = resolve_password(password, input)?;
            if toolkit.hasher.verify(&password, &hash) {
                Ok(Outcome::ok("valid"))
            } else {
                Ok(Outcome::failed("invalid credentials"))
            }
        }

        Command::ValidatePassword { password } => {
            let password = resolve_password(password, input)?;
            match toolkit.policy.validate(&password) {
                Ok(()) => Ok(Outcome::ok("valid")),
                Err(violation) => Ok(Outcome::failed(violation.to_string())),
            }
        }

        Command::Login {
            hash,
            uid,
            email,
            scopes,
            password,
        } => {
            let authenticator = toolkit.authenticator()?;
            let password = resolve_password(password, input)?;
            let principal = Principal {
                user_id: uid,
                email,
                scopes,
            };

            match authenticator.authenticate(&password, &hash, &principal).await {
                Ok(access) => Ok(Outcome::ok(serde_json::to_string(&access)?)),
                Err(AuthenticationError::InvalidCredentials) => {
                    Ok(Outcome::failed("invalid credentials"))
                }
                Err(e) => Err(e.into()),
            }
        }

        Command::IssueToken {
            uid,
            email,
            scopes,
            ttl_seconds,
        } => {
            let authenticator = toolkit.authenticator()?;
            let tokens = authenticator.tokens();

            let ttl = match ttl_seconds {
                Some(seconds) => Duration::try_seconds(seconds)
                    .with_context(|| format!("token lifetime of {} seconds is out of range", seconds))?,
                None => authenticator.token_ttl(),
            };

            let now = tokens.now();
            let expires = now
                .checked_add_signed(ttl)
                .context("token expiry is out of range")?;

            let mut builder = tokens
                .new_token()
                .set_not_before(now)
                .set_issued_at(now)
                .set_expiry(expires)
                .add_claim(CLAIM_USER_ID, uid)
                .add_claim(CLAIM_SCOPES, scopes);
            if let Some(email) = email {
                builder = builder.add_claim(CLAIM_EMAIL, email);
            }

            let token = builder.build().await?;
            let access = AccessToken::new(&token, expires);
            Ok(Outcome::ok(serde_json::to_string(&access)?))
        }

        Command::VerifyToken { token, scopes } => {
            let authenticator = toolkit.authenticator()?;
            let tokens = authenticator.tokens();

            if scopes.is_empty() {
                return Ok(if tokens.verify_token(token.as_bytes()).await {
                    Outcome::ok("valid")
                } else {
                    Outcome::failed("invalid credentials")
                });
            }

            let required: Vec<&str> = scopes.iter().map(String::as_str).collect();
            match tokens.verify_with_scopes(token.as_bytes(), &required).await {
                Ok(_) => Ok(Outcome::ok("valid")),
                Err(AuthorizationError::Unauthorized) => Ok(Outcome::failed("invalid credentials")),
                Err(AuthorizationError::Forbidden) => Ok(Outcome::failed("forbidden")),
            }
        }
    }
}

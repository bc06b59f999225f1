use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::FileFormat;
use credentials::HasherOptions;
use credentials::PolicyOptions;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Absent when only password commands are used.
    pub token: Option<TokenConfig>,
    #[serde(default)]
    pub password: HasherOptions,
    #[serde(default)]
    pub policy: PolicyOptions,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub key_id: String,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: i64,
    pub signer: SignerConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignerConfig {
    /// RSA private key in a PEM file (PKCS#8 or PKCS#1).
    Local { private_key_path: String },
    /// Key-management service reached over HTTP.
    Remote {
        endpoint: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        max_signature_len: usize,
    },
}

fn default_ttl_seconds() -> i64 {
    3600
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (CREDCTL__TOKEN__KEY_ID, CREDCTL__POLICY__REQUIRED_LENGTH, etc.)
    /// 2. Explicit config file passed on the command line
    /// 3. Environment-specific config file (config/{environment}.toml)
    /// 4. Default config file (config/default.toml)
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }

        let configuration = builder
            // Example: CREDCTL__TOKEN__KEY_ID=alias/other overrides token.key_id
            .add_source(Environment::with_prefix("CREDCTL").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }

    /// Parse configuration from a TOML document, without any layering.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        ConfigBuilder::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

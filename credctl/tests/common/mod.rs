use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::OnceLock;

use credctl::commands;
use credctl::config::Config;
use credctl::config::SignerConfig;
use credctl::config::TokenConfig;
use credctl::Command;
use credctl::Outcome;
use credctl::Toolkit;
use credentials::HasherOptions;
use credentials::PolicyOptions;
use rsa::pkcs8::EncodePrivateKey;
use rsa::pkcs8::LineEnding;
use rsa::RsaPrivateKey;

static KEY_FILES: AtomicUsize = AtomicUsize::new(0);

/// Toolkit wired to a freshly written local signing key
pub struct TestApp {
    pub toolkit: Toolkit,
    pub key_path: PathBuf,
}

impl TestApp {
    /// Build a toolkit with a local signer and a fast hasher
    pub fn spawn() -> Self {
        let key_path = write_key_file();

        let config = Config {
            token: Some(TokenConfig {
                key_id: "alias/test-jwt".to_string(),
                ttl_seconds: 3600,
                signer: SignerConfig::Local {
                    private_key_path: key_path.to_string_lossy().into_owned(),
                },
            }),
            password: fast_hasher_options(),
            policy: PolicyOptions::default(),
        };

        let toolkit = Toolkit::from_config(&config).expect("Failed to build toolkit");

        Self { toolkit, key_path }
    }

    /// Build a toolkit without token signing configured
    pub fn spawn_password_only() -> Self {
        let config = Config {
            token: None,
            password: fast_hasher_options(),
            policy: PolicyOptions::default(),
        };

        let toolkit = Toolkit::from_config(&config).expect("Failed to build toolkit");

        Self {
            toolkit,
            key_path: PathBuf::new(),
        }
    }

    /// Run a command with an empty stdin
    pub async fn run(&self, command: Command) -> Outcome {
        self.try_run(command).await.expect("Command failed")
    }

    pub async fn try_run(&self, command: Command) -> anyhow::Result<Outcome> {
        let mut input = Cursor::new(Vec::new());
        commands::run(command, &self.toolkit, &mut input).await
    }

    /// Run a command with the given stdin contents
    pub async fn run_with_input(&self, command: Command, input: &str) -> Outcome {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        commands::run(command, &self.toolkit, &mut input)
            .await
            .expect("Command failed")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if self.key_path.as_os_str().is_empty() {
            return;
        }
        let _ = std::fs::remove_file(&self.key_path);
    }
}

fn fast_hasher_options() -> HasherOptions {
    HasherOptions {
        iterations: 1000,
        ..HasherOptions::default()
    }
}

/// One 1024-bit key per test binary; generation dominates test time otherwise
fn test_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        let key =
            RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("Failed to generate key");
        key.to_pkcs8_pem(LineEnding::LF)
            .expect("Failed to encode key")
            .to_string()
    })
}

fn write_key_file() -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "credctl-test-{}-{}.pem",
        std::process::id(),
        KEY_FILES.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::write(&path, test_key_pem()).expect("Failed to write key file");
    path
}

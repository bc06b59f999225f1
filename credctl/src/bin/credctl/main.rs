use std::io;
use std::process::ExitCode;

use clap::Parser;
use credctl::commands;
use credctl::config::Config;
use credctl::Cli;
use credctl::Toolkit;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode, anyhow::Error> {
    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "credctl=info,credentials=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(
        token_signing = config.token.is_some(),
        iterations = config.password.iterations,
        "Configuration loaded"
    );

    let toolkit = Toolkit::from_config(&config)?;

    let mut stdin = io::stdin().lock();
    let outcome = commands::run(cli.command, &toolkit, &mut stdin).await?;

    if outcome.success {
        println!("{}", outcome.message);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", outcome.message);
        Ok(ExitCode::FAILURE)
    }
}

//! One-shot corpus validation.
//!
//! Prints the validation report, corpus statistics and alerts as JSON and
//! exits non-zero when any error alert is raised. Suitable for CI.

use anyhow::Result;
use content_engine::alerts::Severity;
use content_engine::config::Config;
use content_engine::ContentEngine;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in CI)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("content_engine=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    info!("Validating content in {}", config.content_dir.display());

    let engine = ContentEngine::from_config(&config)?;
    let run = engine.validate().await?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    info!(
        "{} errors, {} warnings, {} info alerts",
        run.count(Severity::Error),
        run.count(Severity::Warning),
        run.count(Severity::Info)
    );

    if run.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

use anyhow::{Context, Result};
use content_engine::api::{self, AppState};
use content_engine::config::Config;
use content_engine::scheduler;
use content_engine::ContentEngine;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("content_engine=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting content engine");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!("Serving content from {}", config.content_dir.display());

    let engine = Arc::new(ContentEngine::from_config(&config)?);

    // Keep the handle alive for the lifetime of the server
    let _scheduler = if config.validation_schedule.is_empty() {
        info!("No VALIDATION_SCHEDULE set, scheduled validation disabled");
        None
    } else {
        Some(scheduler::start_scheduler(&config, Arc::clone(&engine)).await?)
    };

    if config.api_key.is_none() {
        info!("API_KEY not set, mutating endpoints are unauthenticated");
    }

    let app = api::router(AppState {
        engine,
        api_key: config.api_key.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("✓ Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

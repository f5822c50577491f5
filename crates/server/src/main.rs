use std::sync::Arc;

use anyhow::Context;
use deductly_classify::OpenAiClassifier;
use deductly_server::{router, AppConfig, AppState};
use deductly_storage::MemStore;
use deductly_sync::GoogleSheetsSource;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    if !config.openai.is_configured() {
        tracing::warn!("OPENAI_API_KEY is not set; new expenses will stay unclassified");
    }
    if !config.sheets.is_configured() {
        tracing::info!("Google Sheets credentials not set; sheet sync is disabled");
    }

    let classifier = OpenAiClassifier::new(config.openai.clone())?;
    let source = GoogleSheetsSource::new(config.sheets.clone())?;
    let state = AppState::new(
        Arc::new(classifier),
        Arc::new(MemStore::new()),
        Arc::new(source),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    tracing::info!("Listening on {}", config.bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

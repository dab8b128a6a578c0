use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use tracing_subscriber::EnvFilter;

use devotional::gemini::GeminiClient;
use devotional::narration::GeminiNarrator;
use devotional::scripture::BibleApiClient;
use devotional::{run_server, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    if !config.has_api_key() {
        tracing::warn!("GEMINI_API_KEY is not set; counselor, devotional, search and narration will fail");
    }

    let http = Client::builder().timeout(config.http_timeout).build()?;

    let gemini = GeminiClient::new(
        http.clone(),
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
    );
    let scripture = BibleApiClient::new(http, config.scripture_base_url.clone());
    let narrator = GeminiNarrator::new(gemini.clone(), config.models.tts_model.clone());

    let state = AppState::new(
        &config,
        Arc::new(scripture),
        Arc::new(gemini),
        Arc::new(narrator),
    );

    run_server(config, state).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

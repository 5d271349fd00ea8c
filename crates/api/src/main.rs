mod config;
mod metrics;
mod retry;
mod routes;

use anyhow::Context;
use extract::{ChatCompletionsClient, Extractor};
use pipeline::Pipeline;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use metrics::Metrics;
use retry::{RetryPolicy, RetryingService};
use routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.server.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if config.extraction.api_key.is_none() {
        tracing::warn!("EXTRACTION_API_KEY is not set; requests will be sent unauthenticated");
    }

    let client = ChatCompletionsClient::new(
        config.extraction.base_url.clone(),
        config.extraction.model.clone(),
        config.extraction.api_key.clone(),
    )
    .with_timeout(Duration::from_secs(config.extraction.request_timeout_secs))
    .context("Failed to build extraction client")?;

    let service = RetryingService::new(client, RetryPolicy::from(&config.retry));
    let pipeline = Pipeline::new(Extractor::new(Arc::new(service)), config.pipeline_options());

    let state = Arc::new(AppState {
        pipeline,
        metrics: Metrics::new(),
        analysis_timeout: config.server.analysis_timeout_secs.map(Duration::from_secs),
    });

    let app = routes::router(state, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;

    tracing::info!(
        addr = %config.server.bind_addr,
        model = %config.extraction.model,
        max_pages = config.chunking.max_pages_per_chunk,
        chunk_delay_secs = config.chunking.chunk_delay_secs,
        "Server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

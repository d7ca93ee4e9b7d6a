//! Main entry point for the GenAI Gateway

use genai_gateway::{
    api,
    backend::OpenAiProvider,
    config::{LoggingConfig, Settings},
    gateway::spawn_rate_limit_cleanup,
    storage::{MemoryGenerationStore, MemoryUsageStore},
    AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    // Load configuration before logging so the configured level applies
    let settings = Settings::load()?;
    init_tracing(&settings.logging);

    info!("Starting GenAI Gateway");
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        provider = %settings.provider.base_url,
        rate_limit_enabled = settings.rate_limit.enabled,
        requests_per_window = settings.rate_limit.requests_per_window,
        window_secs = settings.rate_limit.window_secs,
        "Loaded configuration"
    );

    let provider = Arc::new(OpenAiProvider::new(&settings.provider)?);
    let records = Arc::new(MemoryGenerationStore::new());
    let usage_store = Arc::new(MemoryUsageStore::new());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let cleanup_interval = settings.rate_limit.cleanup_interval_secs;

    let app_state = Arc::new(AppState::new(settings, provider, records, usage_store));

    if app_state.rate_limiter.is_enabled() {
        spawn_rate_limit_cleanup(app_state.rate_limiter.clone(), cleanup_interval);
    }

    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

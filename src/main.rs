use anyhow::Context;
use flex_assistant::{
    config::Config,
    http::{self, AppState},
    provider::GeminiProvider,
    reaper::Reaper,
    relay::ChatRelay,
    store::{MemorySessionStore, SessionStore},
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let dotenv = dotenvy::dotenv();

    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = dotenv {
        // Not fatal, the environment may already be set
        info!("No .env file found or failed to load: {}", e);
    }

    let config = Config::from_env().context("Invalid configuration")?;

    let provider =
        GeminiProvider::new(config.gemini.clone()).context("Failed to build Gemini client")?;
    if provider.has_api_key() {
        info!("Gemini API key loaded successfully");
    } else {
        warn!("GEMINI_API_KEY not found in environment variables, replies will use offline mode");
    }

    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let relay = ChatRelay::new(store.clone(), Arc::new(provider), config.provider_timeout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = tokio::spawn(Reaper::new(store, config.reaper).run(shutdown_rx));

    let app = http::router(Arc::new(AppState {
        relay,
        expose_error_details: config.environment.exposes_error_details(),
    }));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gemini Fitness Assistant API running on {}", addr);
    info!("Health check: http://localhost:{}/health", config.port);

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down...");
    });
    if let Err(e) = server.await {
        error!("Server stopped with error: {}", e);
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = reaper_handle.await {
        error!("Session reaper panicked: {}", e);
    }

    Ok(())
}

use tracing_subscriber::EnvFilter;

use speech_proxy_server::api::routes::create_router;
use speech_proxy_server::config::Config;
use speech_proxy_server::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env is fine; the real environment still applies.
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    let addr = config.addr()?;

    tracing::info!("Speech proxy server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);

    if config.elevenlabs.is_none() {
        tracing::warn!("ELEVENLABS_API_KEY not set. Will use OpenAI TTS as fallback.");
    }

    let state = speech_proxy_server::build_state(&config);
    tracing::info!("TTS providers: {}", state.speech.providers().join(" -> "));

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

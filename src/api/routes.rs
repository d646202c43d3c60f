use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use crate::speech::SpeechService;

/// Upstream transcription rejects files above 25 MB.
pub const AUDIO_UPLOAD_LIMIT_BYTES: usize = 25 * 1024 * 1024;

pub struct AppState {
    pub speech: SpeechService,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Wildcards are not allowed alongside credentials, so mirror the request instead.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Router::new()
        .route("/tts", post(handlers::text_to_speech))
        .route(
            "/whisper",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(AUDIO_UPLOAD_LIMIT_BYTES)),
        )
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

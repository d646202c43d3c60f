use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::speech::ProviderError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[from] JsonRejection),

    #[error("Invalid multipart body: {0}")]
    InvalidMultipart(#[from] MultipartError),

    #[error("TTS generation failed: {0}")]
    Synthesis(ProviderError),

    #[error("{0}")]
    Transcription(ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InvalidJson(e) => (StatusCode::BAD_REQUEST, "INVALID_JSON", e.body_text()),
            AppError::InvalidMultipart(e) => (e.status(), "INVALID_MULTIPART", e.body_text()),
            AppError::Synthesis(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TTS_ERROR",
                e.to_string(),
            ),
            AppError::Transcription(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRANSCRIPTION_ERROR",
                e.to_string(),
            ),
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            AppError::IoError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                e.to_string(),
            ),
        };

        tracing::error!("Request failed: {} - {}", code, message);

        (
            status,
            Json(ErrorResponse {
                detail: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

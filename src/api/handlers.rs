use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use std::sync::Arc;

use super::{HealthResponse, SpeakRequest, TranscriptionResponse};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::speech::{AudioUpload, SynthesisResult};

pub async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<SynthesisResult, AppError> {
    tracing::info!("Received POST /tts request");

    let Json(request) = payload?;
    let text = request.input.unwrap_or_default();

    state.speech.synthesize(&text).await
}

pub async fn transcribe(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;

    let transcript = state.speech.transcribe(upload).await?;

    Ok(Json(TranscriptionResponse {
        transcription: transcript.text,
    }))
}

/// Pull the `file` field out of the form. Other fields are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<AudioUpload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".into()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        return Ok(AudioUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(AppError::BadRequest("No audio file provided".into()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tts_providers: state.speech.providers(),
    })
}

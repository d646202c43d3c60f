pub mod handlers;
pub mod routes;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tts_providers: Vec<&'static str>,
}

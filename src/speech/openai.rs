use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{
    body_stream, check_status, AudioStream, AudioUpload, ProviderError, ProviderErrorKind,
    SpeechSynthesizer, Transcriber, Transcript,
};
use crate::config::OpenAiConfig;

const PROVIDER: &str = "openai";

/// OpenAI audio API: streamed speech and Whisper transcription.
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: OpenAiConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl SpeechSynthesizer for OpenAiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn synthesize(&self, text: &str) -> Result<AudioStream, ProviderError> {
        let body = SpeechRequest {
            model: &self.config.speech_model,
            voice: &self.config.speech_voice,
            input: text,
            response_format: &self.config.speech_format,
        };

        let response = self
            .client
            .post(self.url("audio/speech"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;
        Ok(body_stream(PROVIDER, response))
    }
}

#[async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, upload: AudioUpload) -> Result<Transcript, ProviderError> {
        let mime = upload
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let length = upload.bytes.len() as u64;
        let part = Part::stream_with_length(upload.bytes, length)
            .file_name(upload.filename)
            .mime_str(mime)
            .map_err(|e| {
                ProviderError::new(
                    PROVIDER,
                    ProviderErrorKind::Unknown,
                    format!("Invalid content type '{}': {}", mime, e),
                )
            })?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.config.transcription_model.clone());

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;
        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        Ok(Transcript { text: parsed.text })
    }
}

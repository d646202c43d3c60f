use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::provider::{body_stream, check_status, AudioStream, ProviderError, SpeechSynthesizer};
use crate::config::{ElevenLabsConfig, VoiceSettings};

const PROVIDER: &str = "elevenlabs";

pub struct ElevenLabsClient {
    config: ElevenLabsConfig,
    client: Client,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: ElevenLabsConfig, client: Client) -> Self {
        Self { config, client }
    }
}

#[derive(Serialize)]
struct ConvertRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn synthesize(&self, text: &str) -> Result<AudioStream, ProviderError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.voice_id
        );

        let body = ConvertRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: &self.config.voice_settings,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;
        Ok(body_stream(PROVIDER, response))
    }
}

//! Thin speech backend: `/tts` synthesizes through ElevenLabs with an OpenAI
//! fallback, `/whisper` transcribes uploads through OpenAI.

pub mod api;
pub mod config;
pub mod error;
pub mod speech;

use std::sync::Arc;

use api::routes::AppState;
use config::Config;
use speech::{ElevenLabsClient, OpenAiClient, SpeechService, SpeechSynthesizer};

/// Wire the provider clients described by `config` into a [`SpeechService`].
pub fn build_speech_service(config: &Config) -> SpeechService {
    let openai = Arc::new(OpenAiClient::new(config.openai.clone()));

    let elevenlabs = config.elevenlabs.clone().map(|el| {
        Arc::new(ElevenLabsClient::new(el)) as Arc<dyn SpeechSynthesizer>
    });

    SpeechService::new(elevenlabs, openai.clone(), openai)
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    Arc::new(AppState {
        speech: build_speech_service(config),
    })
}

use std::net::SocketAddr;

use serde::Serialize;

use crate::error::AppError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Adam
pub const DEFAULT_ELEVENLABS_VOICE_ID: &str = "pNInz6obpgDQGcFmaJgB";

/// Everything the server reads from its environment. Built once in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai: OpenAiConfig,
    pub elevenlabs: Option<ElevenLabsConfig>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub speech_model: String,
    pub speech_voice: String,
    pub speech_format: String,
    pub transcription_model: String,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub base_url: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub voice_settings: VoiceSettings,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.0,
        }
    }
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            speech_model: "tts-1-hd".to_string(),
            speech_voice: "onyx".to_string(),
            speech_format: "mp3".to_string(),
            transcription_model: "whisper-1".to_string(),
        }
    }
}

impl ElevenLabsConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            voice_id: DEFAULT_ELEVENLABS_VOICE_ID.to_string(),
            model_id: "eleven_turbo_v2_5".to_string(),
            output_format: "mp3_44100_128".to_string(),
            voice_settings: VoiceSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_key = get("OPENAI_API_KEY").ok_or_else(|| {
            AppError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a number, got '{}'", raw)))?,
            None => 8000,
        };

        let mut openai = OpenAiConfig::new(openai_key);
        if let Some(url) = get("OPENAI_BASE_URL") {
            openai.base_url = url;
        }

        let elevenlabs = get("ELEVENLABS_API_KEY").map(|key| {
            let mut config = ElevenLabsConfig::new(key);
            if let Some(url) = get("ELEVENLABS_BASE_URL") {
                config.base_url = url;
            }
            if let Some(voice_id) = get("ELEVENLABS_VOICE_ID") {
                config.voice_id = voice_id;
            }
            config
        });

        Ok(Self {
            host,
            port,
            openai,
            elevenlabs,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid address: {}", e)))
    }
}

pub mod elevenlabs;
pub mod openai;
pub mod provider;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};

use crate::error::AppError;

pub use elevenlabs::ElevenLabsClient;
pub use openai::OpenAiClient;
pub use provider::{
    AudioStream, AudioUpload, ProviderError, ProviderErrorKind, SpeechSynthesizer, Transcriber,
    Transcript,
};

pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Size of each chunk forwarded from a live upstream stream.
pub const STREAM_CHUNK_SIZE: usize = 1024;

pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 10] = [
    "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Synthesized audio, either fully collected or still arriving.
pub enum SynthesisResult {
    Buffered(Bytes),
    Streamed(AudioStream),
}

impl SynthesisResult {
    pub fn is_buffered(&self) -> bool {
        matches!(self, SynthesisResult::Buffered(_))
    }
}

impl IntoResponse for SynthesisResult {
    fn into_response(self) -> Response {
        let body = match self {
            SynthesisResult::Buffered(bytes) => Body::from(bytes),
            SynthesisResult::Streamed(stream) => Body::from_stream(stream),
        };

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-store"),
            ],
            body,
        )
            .into_response()
    }
}

pub struct SpeechService {
    preferred: Option<Arc<dyn SpeechSynthesizer>>,
    backstop: Arc<dyn SpeechSynthesizer>,
    transcriber: Arc<dyn Transcriber>,
}

impl SpeechService {
    /// `preferred` is tried first and fully buffered; `backstop` is streamed live
    /// and is the last resort.
    pub fn new(
        preferred: Option<Arc<dyn SpeechSynthesizer>>,
        backstop: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            preferred,
            backstop,
            transcriber,
        }
    }

    /// Synthesis providers in the order they are tried.
    pub fn providers(&self) -> Vec<&'static str> {
        self.preferred
            .iter()
            .map(|p| p.name())
            .chain(std::iter::once(self.backstop.name()))
            .collect()
    }

    pub async fn synthesize(&self, text: &str) -> Result<SynthesisResult, AppError> {
        if text.is_empty() {
            return Err(AppError::BadRequest("Missing input text".into()));
        }

        let Some(preferred) = &self.preferred else {
            tracing::info!(
                "No preferred TTS provider configured, using {}",
                self.backstop.name()
            );
            return self.stream_backstop(text).await;
        };

        tracing::info!("Attempting to use {} TTS", preferred.name());
        match collect_audio(preferred.as_ref(), text).await {
            Ok(audio) => return Ok(SynthesisResult::Buffered(audio)),
            Err(e) if e.is_unauthorized() => {
                tracing::error!("{} authentication error: {}", preferred.name(), e);
                tracing::info!(
                    "Falling back to {} TTS due to {} authentication issue",
                    self.backstop.name(),
                    preferred.name()
                );
            }
            Err(e) => {
                tracing::error!(kind = %e.kind, "Error with {} TTS: {}", preferred.name(), e);
                tracing::info!("Falling back to {} TTS", self.backstop.name());
            }
        }

        self.stream_backstop(text).await
    }

    async fn stream_backstop(&self, text: &str) -> Result<SynthesisResult, AppError> {
        let upstream = self.backstop.synthesize(text).await.map_err(|e| {
            tracing::error!("{} TTS failed, no provider left: {}", self.backstop.name(), e);
            AppError::Synthesis(e)
        })?;

        Ok(SynthesisResult::Streamed(rechunk(upstream, STREAM_CHUNK_SIZE)))
    }

    pub async fn transcribe(&self, upload: AudioUpload) -> Result<Transcript, AppError> {
        if !is_supported_audio(&upload.filename) {
            return Err(AppError::BadRequest("Unsupported file format".into()));
        }

        let transcript = self
            .transcriber
            .transcribe(upload)
            .await
            .map_err(AppError::Transcription)?;

        let preview: String = transcript.text.chars().take(50).collect();
        tracing::info!("Transcription: {}...", preview);

        Ok(transcript)
    }
}

/// Drain a provider's stream into one buffer. An empty clip is a failure.
async fn collect_audio(
    provider: &dyn SpeechSynthesizer,
    text: &str,
) -> Result<Bytes, ProviderError> {
    let mut stream = provider.synthesize(text).await?;
    let mut buffer = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }

    if buffer.is_empty() {
        return Err(ProviderError::new(
            provider.name(),
            ProviderErrorKind::Unknown,
            "provider returned no audio",
        ));
    }

    Ok(buffer.freeze())
}

/// Re-slice a byte stream into `size`-byte chunks. The final chunk may be shorter.
/// Stops after the first upstream error.
pub fn rechunk(upstream: AudioStream, size: usize) -> AudioStream {
    let state = (upstream, BytesMut::with_capacity(size), false);

    stream::unfold(state, move |(mut upstream, mut buffer, mut done)| async move {
        loop {
            if buffer.len() >= size {
                let chunk = buffer.split_to(size).freeze();
                return Some((Ok(chunk), (upstream, buffer, done)));
            }

            if done {
                if buffer.is_empty() {
                    return None;
                }
                let chunk = buffer.split().freeze();
                return Some((Ok(chunk), (upstream, buffer, done)));
            }

            match upstream.next().await {
                Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    buffer.clear();
                    return Some((Err(e), (upstream, buffer, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}

/// Extension is whatever follows the last `.`; the whole name when there is none.
pub fn is_supported_audio(filename: &str) -> bool {
    let extension = filename.rsplit('.').next().unwrap_or(filename);
    SUPPORTED_AUDIO_EXTENSIONS.contains(&extension)
}

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;

/// Audio bytes as the upstream yields them.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// How a provider failure should be read by callers deciding what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Credential rejected (HTTP 401).
    Unauthorized,
    /// HTTP 429.
    RateLimited,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &'static str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    /// Transport-level failure: connection refused, TLS, body decode, ...
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        let kind = err
            .status()
            .map(ProviderErrorKind::from_status)
            .unwrap_or(ProviderErrorKind::Unknown);
        Self::new(provider, kind, err.to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ProviderErrorKind::Unauthorized
    }
}

/// Fail on non-2xx, folding the upstream body into the message.
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::new(
        provider,
        ProviderErrorKind::from_status(status),
        format!("API error {}: {}", status, body),
    ))
}

/// Adapt a reqwest body into an [`AudioStream`].
pub(crate) fn body_stream(provider: &'static str, response: reqwest::Response) -> AudioStream {
    response
        .bytes_stream()
        .map(move |chunk| chunk.map_err(|e| ProviderError::transport(provider, e)))
        .boxed()
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns once the upstream has accepted the request; audio arrives on the stream.
    async fn synthesize(&self, text: &str) -> Result<AudioStream, ProviderError>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, upload: AudioUpload) -> Result<Transcript, ProviderError>;
}

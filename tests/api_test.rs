use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use http_body_util::BodyExt;
use tower::ServiceExt;

use speech_proxy_server::api::routes::{create_router, AppState};
use speech_proxy_server::speech::{
    AudioStream, AudioUpload, ProviderError, ProviderErrorKind, SpeechService, SpeechSynthesizer,
    Transcriber, Transcript,
};

const BOUNDARY: &str = "speech-proxy-test-boundary";

/// Provider double that records how often it is called.
struct FakeProvider {
    name: &'static str,
    audio: Option<Vec<u8>>,
    fail_with: ProviderErrorKind,
    calls: AtomicUsize,
}

impl FakeProvider {
    fn serving(name: &'static str, audio: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            name,
            audio: Some(audio.to_vec()),
            fail_with: ProviderErrorKind::Unknown,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &'static str, kind: ProviderErrorKind) -> Arc<Self> {
        Arc::new(Self {
            name,
            audio: None,
            fail_with: kind,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error(&self) -> ProviderError {
        ProviderError::new(self.name, self.fail_with, "upstream unavailable")
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn synthesize(&self, _text: &str) -> Result<AudioStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let audio = self.audio.clone().ok_or_else(|| self.error())?;

        // Uneven upstream chunking
        let chunks: Vec<Result<Bytes, ProviderError>> = audio
            .chunks(700)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

#[async_trait]
impl Transcriber for FakeProvider {
    async fn transcribe(&self, upload: AudioUpload) -> Result<Transcript, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audio.as_ref().ok_or_else(|| self.error())?;
        Ok(Transcript {
            text: format!("heard {} bytes from {}", upload.bytes.len(), upload.filename),
        })
    }
}

fn app(
    elevenlabs: Option<Arc<FakeProvider>>,
    openai: Arc<FakeProvider>,
    transcriber: Arc<FakeProvider>,
) -> Router {
    let preferred = elevenlabs.map(|p| p as Arc<dyn SpeechSynthesizer>);
    create_router(Arc::new(AppState {
        speech: SpeechService::new(preferred, openai, transcriber),
    }))
}

fn tts_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn whisper_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/whisper")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn tts_serves_elevenlabs_audio_when_configured() {
    let eleven = FakeProvider::serving("elevenlabs", b"ID3-eleven-audio");
    let openai = FakeProvider::serving("openai", b"ID3-openai-audio");
    let app = app(Some(eleven.clone()), openai.clone(), openai.clone());

    let response = app.oneshot(tts_request(r#"{"input":"Hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(body_bytes(response).await.as_ref(), b"ID3-eleven-audio");
    assert_eq!(eleven.calls(), 1);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn tts_falls_back_to_openai_on_auth_failure() {
    let eleven = FakeProvider::failing("elevenlabs", ProviderErrorKind::Unauthorized);
    let audio = vec![42u8; 3000];
    let openai = FakeProvider::serving("openai", &audio);
    let app = app(Some(eleven.clone()), openai.clone(), openai.clone());

    let response = app.oneshot(tts_request(r#"{"input":"Hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(body_bytes(response).await.to_vec(), audio);
    assert_eq!(eleven.calls(), 1);
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn tts_without_elevenlabs_streams_openai() {
    let openai = FakeProvider::serving("openai", b"ID3-openai-audio");
    let app = app(None, openai.clone(), openai.clone());

    let response = app.oneshot(tts_request(r#"{"input":"Hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(body_bytes(response).await.as_ref(), b"ID3-openai-audio");
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn tts_rejects_missing_or_empty_input_without_calling_providers() {
    for body in [r#"{"input":""}"#, r#"{}"#, r#"{"input":null}"#, "not json"] {
        let eleven = FakeProvider::serving("elevenlabs", b"audio");
        let openai = FakeProvider::serving("openai", b"audio");
        let app = app(Some(eleven.clone()), openai.clone(), openai.clone());

        let response = app.oneshot(tts_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(eleven.calls(), 0);
        assert_eq!(openai.calls(), 0);
    }
}

#[tokio::test]
async fn tts_returns_500_when_no_provider_works() {
    let eleven = FakeProvider::failing("elevenlabs", ProviderErrorKind::Unauthorized);
    let openai = FakeProvider::failing("openai", ProviderErrorKind::Unknown);
    let app = app(Some(eleven), openai.clone(), openai.clone());

    let response = app.oneshot(tts_request(r#"{"input":"Hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_ne!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    let json = body_json(response).await;
    assert_eq!(json["code"], "TTS_ERROR");
}

#[tokio::test]
async fn whisper_rejects_unsupported_extension() {
    let openai = FakeProvider::serving("openai", b"");
    let app = app(None, openai.clone(), openai.clone());

    let response = app
        .oneshot(whisper_request("photo.png", b"\x89PNG"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Unsupported file format");
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn whisper_returns_provider_transcription() {
    let openai = FakeProvider::serving("openai", b"");
    let app = app(None, openai.clone(), openai.clone());

    let response = app
        .oneshot(whisper_request("voice.wav", b"RIFF1234"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({ "transcription": "heard 8 bytes from voice.wav" })
    );
    assert_eq!(openai.calls(), 1);
}

#[tokio::test]
async fn whisper_surfaces_provider_failure_as_500() {
    let openai = FakeProvider::failing("openai", ProviderErrorKind::RateLimited);
    let app = app(None, openai.clone(), openai.clone());

    let response = app
        .oneshot(whisper_request("voice.webm", b"webm"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["detail"],
        "openai: upstream unavailable"
    );
}

#[tokio::test]
async fn whisper_without_file_field_is_bad_request() {
    let openai = FakeProvider::serving("openai", b"");
    let app = app(None, openai.clone(), openai.clone());

    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"model\"\r\n\r\nwhisper-1\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/whisper")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn cors_allows_any_origin_with_credentials() {
    let openai = FakeProvider::serving("openai", b"audio");
    let app = app(None, openai.clone(), openai.clone());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/tts")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(openai.calls(), 0);
}

#[tokio::test]
async fn health_lists_providers_in_order() {
    let eleven = FakeProvider::serving("elevenlabs", b"audio");
    let openai = FakeProvider::serving("openai", b"audio");
    let app = app(Some(eleven), openai.clone(), openai);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tts_providers"], serde_json::json!(["elevenlabs", "openai"]));
}

//! HTTP routes, request validation, and error mapping.
//!
//! The router is driven with `oneshot` against mock collaborators, so no
//! FFmpeg, yt-dlp, or network access is needed.

#![cfg(feature = "server")]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use clipgif::server::{AppState, create_router};
use clipgif::{
    ConversionError, ConversionOptions, LoopMode, PipelineError, ResizePercent, SourceError,
    SpeedMultiplier, Transcode, UrlExtractor, VideoClipper,
};
use serde_json::Value;
use tower::ServiceExt;

const FAKE_GIF: &[u8] = b"GIF89a-mock";
const FAKE_MP4: &[u8] = b"\x00\x00\x00\x18ftypmp42-mock";
const BOUNDARY: &str = "clipgif-test-boundary";

// ── Mocks ────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum TranscodeOutcome {
    Succeed,
    FailDecoding,
    FailHost,
}

struct MockTranscoder {
    outcome: TranscodeOutcome,
    calls: Mutex<Vec<(usize, ConversionOptions)>>,
}

impl Transcode for MockTranscoder {
    fn transcode(
        &self,
        video: &[u8],
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        options.validate()?;
        self.calls.lock().unwrap().push((video.len(), *options));
        match self.outcome {
            TranscodeOutcome::Succeed => Ok(FAKE_GIF.to_vec()),
            TranscodeOutcome::FailDecoding => Err(ConversionError::ConversionFailed(
                PipelineError::DecoderOpen("Invalid data found when processing input".into()),
            )),
            TranscodeOutcome::FailHost => Err(ConversionError::ConversionFailed(
                PipelineError::Io(std::io::Error::other("No space left on device")),
            )),
        }
    }
}

struct MockSources {
    fail: bool,
    clips: Mutex<Vec<(String, f64, f64)>>,
}

impl UrlExtractor for MockSources {
    fn extract_url(&self, post_url: &str) -> Result<String, SourceError> {
        if self.fail {
            return Err(SourceError::ExtractFailed("Unsupported URL".into()));
        }
        Ok(format!("https://cdn.example.com/direct.mp4?from={post_url}"))
    }
}

impl VideoClipper for MockSources {
    fn clip(
        &self,
        source_url: &str,
        start_seconds: f64,
        end_seconds: f64,
    ) -> Result<Vec<u8>, SourceError> {
        self.clips
            .lock()
            .unwrap()
            .push((source_url.to_string(), start_seconds, end_seconds));
        if self.fail {
            return Err(SourceError::ClipFailed("HTTP Error 404: Not Found".into()));
        }
        Ok(FAKE_MP4.to_vec())
    }
}

struct Harness {
    router: Router,
    transcoder: Arc<MockTranscoder>,
    sources: Arc<MockSources>,
}

fn harness_with(outcome: TranscodeOutcome, sources_fail: bool) -> Harness {
    let transcoder = Arc::new(MockTranscoder {
        outcome,
        calls: Mutex::new(Vec::new()),
    });
    let sources = Arc::new(MockSources {
        fail: sources_fail,
        clips: Mutex::new(Vec::new()),
    });
    let state = AppState::new(transcoder.clone(), sources.clone(), sources.clone());
    Harness {
        router: create_router(state, 1024 * 1024),
        transcoder,
        sources,
    }
}

fn harness() -> Harness {
    harness_with(TranscodeOutcome::Succeed, false)
}

// ── Request helpers ──────────────────────────────────────────────

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_body(field: &str, file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    let disposition = match file_name {
        Some(name) => format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n"),
        None => format!("Content-Disposition: form-data; name=\"{field}\"\r\n"),
    };
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post_multipart(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .map(|value| value.to_str().unwrap().to_string())
        .unwrap_or_default()
}

// ── Informational routes ─────────────────────────────────────────

#[tokio::test]
async fn root_describes_the_service() {
    let harness = harness();
    let response = send(&harness.router, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["message"], "Video Services API");
    assert_eq!(body["endpoints"]["file_to_gif"], "/api/video/to-gif/from-file");
}

#[tokio::test]
async fn health_reports_healthy() {
    let harness = harness();
    let response = send(&harness.router, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"status": "healthy"}));
}

#[tokio::test]
async fn cors_is_permissive() {
    let harness = harness();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(&harness.router, request).await;
    assert_eq!(header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
}

// ── Extract URL ──────────────────────────────────────────────────

#[tokio::test]
async fn extract_url_returns_the_direct_url() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json("/api/video/extract-url", r#"{"url": "https://x.com/user/status/1"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["video_url"],
        "https://cdn.example.com/direct.mp4?from=https://x.com/user/status/1"
    );
}

#[tokio::test]
async fn extract_url_rejects_non_http_urls() {
    let harness = harness();
    for url in ["ftp://example.com/video", "not a url", "file:///etc/passwd"] {
        let body = format!(r#"{{"url": "{url}"}}"#);
        let response = send(&harness.router, post_json("/api/video/extract-url", &body)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{url}");
        assert!(body_json(response).await["detail"].is_string());
    }
}

#[tokio::test]
async fn extract_url_requires_a_url_field() {
    let harness = harness();
    let response = send(&harness.router, post_json("/api/video/extract-url", "{}")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn extract_url_failure_is_a_bad_request() {
    let harness = harness_with(TranscodeOutcome::Succeed, true);
    let response = send(
        &harness.router,
        post_json("/api/video/extract-url", r#"{"url": "https://example.com/p/1"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Failed to extract video URL: Unsupported URL"
    );
}

// ── Clip ─────────────────────────────────────────────────────────

#[tokio::test]
async fn clip_returns_an_mp4_attachment() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json(
            "/api/video/clip",
            r#"{"url": "https://example.com/v.mp4", "start_time": 1.5, "end_time": 4}"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "video/mp4");
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=clipped_video.mp4"
    );
    assert_eq!(body_bytes(response).await, FAKE_MP4);

    let clips = harness.sources.clips.lock().unwrap();
    assert_eq!(clips.as_slice(), &[("https://example.com/v.mp4".to_string(), 1.5, 4.0)]);
}

#[tokio::test]
async fn clip_rejects_an_inverted_range() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json(
            "/api/video/clip",
            r#"{"url": "https://example.com/v.mp4", "start_time": 4, "end_time": 2}"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "End time must be greater than start time"
    );
    assert!(harness.sources.clips.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clip_rejects_a_negative_start() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json(
            "/api/video/clip",
            r#"{"url": "https://example.com/v.mp4", "start_time": -1, "end_time": 2}"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Start time cannot be negative");
}

#[tokio::test]
async fn clip_requires_times() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json("/api/video/clip", r#"{"url": "https://example.com/v.mp4"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── GIF from URL ─────────────────────────────────────────────────

#[tokio::test]
async fn url_to_gif_clips_then_converts() {
    let harness = harness();
    let uri = "/api/video/to-gif/from-url?url=https%3A%2F%2Fexample.com%2Fv.mp4\
               &start_time=0&end_time=3&resize=50%25&speed=2x&fps=10&quality=40&loop=once";
    let response = send(&harness.router, get(uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "image/gif");
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=converted.gif"
    );
    assert_eq!(body_bytes(response).await, FAKE_GIF);

    let calls = harness.transcoder.calls.lock().unwrap();
    let (video_len, options) = calls[0];
    assert_eq!(video_len, FAKE_MP4.len());
    assert_eq!(options.resize, ResizePercent::Half);
    assert_eq!(options.speed, SpeedMultiplier::Double);
    assert_eq!(options.fps, 10);
    assert_eq!(options.quality, 40);
    assert_eq!(options.loop_mode, LoopMode::Once);
}

#[tokio::test]
async fn url_to_gif_applies_default_options() {
    let harness = harness();
    let uri = "/api/video/to-gif/from-url?url=https://example.com/v.mp4&start_time=0&end_time=3";
    let response = send(&harness.router, get(uri)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let calls = harness.transcoder.calls.lock().unwrap();
    assert_eq!(calls[0].1, ConversionOptions::default());
}

#[tokio::test]
async fn url_to_gif_rejects_out_of_range_fps_before_clipping() {
    let harness = harness();
    for fps in ["20", "2", "-1"] {
        let uri = format!(
            "/api/video/to-gif/from-url?url=https://example.com/v.mp4&start_time=0&end_time=3&fps={fps}"
        );
        let response = send(&harness.router, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "fps={fps}");
        assert_eq!(body_json(response).await["detail"], "FPS must be between 3 and 10");
    }
    assert!(harness.sources.clips.lock().unwrap().is_empty());
}

#[tokio::test]
async fn url_to_gif_rejects_unknown_enum_values() {
    let harness = harness();
    for option in ["resize=33%25", "speed=3x", "loop=twice"] {
        let uri = format!(
            "/api/video/to-gif/from-url?url=https://example.com/v.mp4&start_time=0&end_time=3&{option}"
        );
        let response = send(&harness.router, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{option}");
    }
}

#[tokio::test]
async fn url_to_gif_requires_url_and_times() {
    let harness = harness();
    let response = send(&harness.router, get("/api/video/to-gif/from-url?start_time=0")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn url_to_gif_reports_clip_failures() {
    let harness = harness_with(TranscodeOutcome::Succeed, true);
    let uri = "/api/video/to-gif/from-url?url=https://example.com/v.mp4&start_time=0&end_time=3";
    let response = send(&harness.router, get(uri)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Failed to clip video: HTTP Error 404: Not Found"
    );
    assert!(harness.transcoder.calls.lock().unwrap().is_empty());
}

// ── GIF from file ────────────────────────────────────────────────

#[tokio::test]
async fn file_to_gif_names_the_attachment_after_the_upload() {
    let harness = harness();
    let body = multipart_body("video", Some("holiday clip.mov"), b"fake video bytes");
    let response = send(
        &harness.router,
        post_multipart("/api/video/to-gif/from-file?resize=25%25&fps=5", body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "image/gif");
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=holiday clip.gif"
    );
    assert_eq!(body_bytes(response).await, FAKE_GIF);

    let calls = harness.transcoder.calls.lock().unwrap();
    assert_eq!(calls[0].0, b"fake video bytes".len());
    assert_eq!(calls[0].1.resize, ResizePercent::Quarter);
    assert_eq!(calls[0].1.fps, 5);
}

#[tokio::test]
async fn file_to_gif_without_a_file_name_uses_the_default() {
    let harness = harness();
    let body = multipart_body("video", None, b"bytes");
    let response = send(&harness.router, post_multipart("/api/video/to-gif/from-file", body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=converted.gif"
    );
}

#[tokio::test]
async fn file_to_gif_requires_the_video_field() {
    let harness = harness();
    let body = multipart_body("document", Some("notes.txt"), b"bytes");
    let response = send(&harness.router, post_multipart("/api/video/to-gif/from-file", body)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(harness.transcoder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn file_to_gif_requires_a_multipart_body() {
    let harness = harness();
    let response = send(
        &harness.router,
        post_json("/api/video/to-gif/from-file", r#"{"video": "x"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn file_to_gif_rejects_bad_quality() {
    let harness = harness();
    let body = multipart_body("video", Some("a.mp4"), b"bytes");
    let response = send(
        &harness.router,
        post_multipart("/api/video/to-gif/from-file?quality=150", body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Quality must be between 0 and 100"
    );
}

#[tokio::test]
async fn conversion_failures_are_bad_requests() {
    let harness = harness_with(TranscodeOutcome::FailDecoding, false);
    let body = multipart_body("video", Some("a.mp4"), b"bytes");
    let response = send(&harness.router, post_multipart("/api/video/to-gif/from-file", body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Failed to convert video to GIF: "), "{detail}");
}

#[tokio::test]
async fn host_failures_are_internal_errors() {
    let harness = harness_with(TranscodeOutcome::FailHost, false);
    let body = multipart_body("video", Some("a.mp4"), b"bytes");
    let response = send(&harness.router, post_multipart("/api/video/to-gif/from-file", body)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.starts_with("Internal server error: "), "{detail}");
    assert!(detail.contains("No space left on device"), "{detail}");
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let transcoder = Arc::new(MockTranscoder {
        outcome: TranscodeOutcome::Succeed,
        calls: Mutex::new(Vec::new()),
    });
    let sources = Arc::new(MockSources {
        fail: false,
        clips: Mutex::new(Vec::new()),
    });
    let router = create_router(
        AppState::new(transcoder.clone(), sources.clone(), sources),
        64,
    );

    let body = multipart_body("video", Some("big.mp4"), &[0u8; 4096]);
    let response = send(&router, post_multipart("/api/video/to-gif/from-file", body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(transcoder.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let harness = harness();
    let response = send(&harness.router, get("/api/video/unknown")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

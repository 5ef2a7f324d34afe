//! Route handlers.
//!
//! Handlers parse and validate the request, hand the blocking work
//! (subprocesses, FFmpeg) to `spawn_blocking`, and wrap the result.

use std::path::Path;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::options::{ConversionOptions, LoopMode, ResizePercent, SpeedMultiplier};
use crate::sources::validate_time_range;

/// Name of the multipart field carrying the uploaded video.
pub const UPLOAD_FIELD: &str = "video";

const DEFAULT_GIF_NAME: &str = "converted.gif";

/// Body of `POST /api/video/extract-url`.
#[derive(Debug, Deserialize)]
pub struct ExtractVideoRequest {
    /// Post page to resolve.
    pub url: String,
}

/// Reply of `POST /api/video/extract-url`.
#[derive(Debug, Serialize)]
pub struct ExtractVideoResponse {
    /// Direct media URL for the post's video.
    pub video_url: String,
}

/// Body of `POST /api/video/clip`.
#[derive(Debug, Deserialize)]
pub struct ClipVideoRequest {
    /// Post page or direct media URL.
    pub url: String,
    /// Clip start, in seconds.
    pub start_time: f64,
    /// Clip end, in seconds.
    pub end_time: f64,
}

fn default_fps() -> i64 {
    8
}

fn default_quality() -> i64 {
    75
}

/// GIF options as they arrive in the query string.
///
/// `fps` and `quality` are read as wide integers so that out-of-range
/// values reach the engine's range check (400) instead of failing to parse
/// (422).
#[derive(Debug, Deserialize)]
pub struct GifQuery {
    /// Output size as a percentage of the source.
    #[serde(default)]
    pub resize: ResizePercent,
    /// Playback speed multiplier.
    #[serde(default)]
    pub speed: SpeedMultiplier,
    /// Output frame rate, 3 to 10.
    #[serde(default = "default_fps")]
    pub fps: i64,
    /// Quality hint, 0 to 100.
    #[serde(default = "default_quality")]
    pub quality: i64,
    /// Loop behaviour, sent as `loop`.
    #[serde(default, rename = "loop")]
    pub loop_mode: LoopMode,
}

impl GifQuery {
    fn options(&self) -> ConversionOptions {
        ConversionOptions::new()
            .with_resize(self.resize)
            .with_speed(self.speed)
            .with_fps(saturate(self.fps))
            .with_quality(saturate(self.quality))
            .with_loop_mode(self.loop_mode)
    }
}

/// Query for the URL-to-GIF endpoint. Repeats the [`GifQuery`] fields
/// because `serde(flatten)` loses number parsing in query strings.
#[derive(Debug, Deserialize)]
pub struct UrlToGifQuery {
    /// Post page or direct media URL.
    pub url: String,
    /// Clip start, in seconds.
    pub start_time: f64,
    /// Clip end, in seconds.
    pub end_time: f64,
    /// See [`GifQuery::resize`].
    #[serde(default)]
    pub resize: ResizePercent,
    /// See [`GifQuery::speed`].
    #[serde(default)]
    pub speed: SpeedMultiplier,
    /// See [`GifQuery::fps`].
    #[serde(default = "default_fps")]
    pub fps: i64,
    /// See [`GifQuery::quality`].
    #[serde(default = "default_quality")]
    pub quality: i64,
    /// See [`GifQuery::loop_mode`].
    #[serde(default, rename = "loop")]
    pub loop_mode: LoopMode,
}

impl UrlToGifQuery {
    fn options(&self) -> ConversionOptions {
        GifQuery {
            resize: self.resize,
            speed: self.speed,
            fps: self.fps,
            quality: self.quality,
            loop_mode: self.loop_mode,
        }
        .options()
    }
}

fn saturate(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Accept only absolute `http`/`https` URLs with a host.
fn validate_url(raw: &str) -> Result<String, ApiError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|error| ApiError::Unprocessable(format!("Invalid URL '{raw}': {error}")))?;
    let supported = matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some();
    if !supported {
        return Err(ApiError::Unprocessable(format!(
            "Invalid URL '{raw}': expected an http or https URL"
        )));
    }
    Ok(parsed.into())
}

/// GIF file name for an upload named `upload_name`.
pub fn gif_file_name(upload_name: Option<&str>) -> String {
    upload_name
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.chars()
                .filter(|c| !c.is_control() && *c != '"' && *c != ';')
                .collect::<String>()
        })
        .filter(|stem| !stem.trim().is_empty())
        .map(|stem| format!("{stem}.gif"))
        .unwrap_or_else(|| DEFAULT_GIF_NAME.to_string())
}

fn attachment(bytes: Vec<u8>, content_type: &'static str, file_name: &str) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename={file_name}"))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=converted.gif"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

/// `GET /`: service name, version and endpoint map.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Video Services API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "extract_video_url": "/api/video/extract-url",
            "clip_video": "/api/video/clip",
            "url_to_gif": "/api/video/to-gif/from-url",
            "file_to_gif": "/api/video/to-gif/from-file",
        },
    }))
}

/// `GET /health`: liveness check.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/video/extract-url`: resolve a post to its direct video URL.
pub async fn extract_video_url(
    State(state): State<AppState>,
    payload: Result<Json<ExtractVideoRequest>, JsonRejection>,
) -> Result<Json<ExtractVideoResponse>, ApiError> {
    let Json(request) = payload?;
    let post_url = validate_url(&request.url)?;

    let extractor = state.extractor.clone();
    let video_url =
        tokio::task::spawn_blocking(move || extractor.extract_url(&post_url)).await??;

    Ok(Json(ExtractVideoResponse { video_url }))
}

/// `POST /api/video/clip`: download a time range as MP4.
pub async fn clip_video(
    State(state): State<AppState>,
    payload: Result<Json<ClipVideoRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let source_url = validate_url(&request.url)?;
    validate_time_range(request.start_time, request.end_time)?;

    let clipper = state.clipper.clone();
    let video = tokio::task::spawn_blocking(move || {
        clipper.clip(&source_url, request.start_time, request.end_time)
    })
    .await??;

    Ok(attachment(video, "video/mp4", "clipped_video.mp4"))
}

/// `GET /api/video/to-gif/from-url`: clip a remote video and convert it.
pub async fn url_to_gif(
    State(state): State<AppState>,
    query: Result<Query<UrlToGifQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let source_url = validate_url(&query.url)?;
    validate_time_range(query.start_time, query.end_time)?;
    let options = query.options();
    // Fail before downloading anything.
    options.validate()?;

    let clipper = state.clipper.clone();
    let transcoder = state.transcoder.clone();
    let (start, end) = (query.start_time, query.end_time);
    let gif = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ApiError> {
        let video = clipper.clip(&source_url, start, end)?;
        Ok(transcoder.transcode(&video, &options)?)
    })
    .await??;

    Ok(attachment(gif, "image/gif", DEFAULT_GIF_NAME))
}

/// `POST /api/video/to-gif/from-file`: convert an uploaded video.
pub async fn file_to_gif(
    State(state): State<AppState>,
    query: Result<Query<GifQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let mut multipart = multipart?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, video) = upload.ok_or_else(|| {
        ApiError::Unprocessable(format!("Missing '{UPLOAD_FIELD}' file upload"))
    })?;
    log::info!(
        "Received upload {:?} ({} bytes) for GIF conversion",
        file_name.as_deref().unwrap_or("<unnamed>"),
        video.len()
    );

    let options = query.options();
    let transcoder = state.transcoder.clone();
    let gif = tokio::task::spawn_blocking(move || transcoder.transcode(&video, &options)).await??;

    Ok(attachment(gif, "image/gif", &gif_file_name(file_name.as_deref())))
}

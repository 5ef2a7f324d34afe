//! HTTP service.
//!
//! [`create_router`] builds the axum router over an [`AppState`] holding the
//! GIF engine and the two video-source collaborators behind trait objects.
//! [`serve`] binds it and runs until Ctrl-C.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | service description |
//! | `GET /health` | liveness |
//! | `POST /api/video/extract-url` | post URL → direct video URL |
//! | `POST /api/video/clip` | URL + time range → MP4 |
//! | `GET /api/video/to-gif/from-url` | URL + time range + options → GIF |
//! | `POST /api/video/to-gif/from-file` | multipart upload + options → GIF |

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::config::ServiceConfig;
use crate::engine::{GifTranscoder, Transcode};
use crate::sources::{UrlExtractor, VideoClipper, YtDlp};

pub use error::ApiError;

/// Shared, read-only handles used by the handlers.
#[derive(Clone)]
pub struct AppState {
    /// Video-to-GIF engine.
    pub transcoder: Arc<dyn Transcode>,
    /// Post URL resolver.
    pub extractor: Arc<dyn UrlExtractor>,
    /// Time-range downloader.
    pub clipper: Arc<dyn VideoClipper>,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    pub fn new(
        transcoder: Arc<dyn Transcode>,
        extractor: Arc<dyn UrlExtractor>,
        clipper: Arc<dyn VideoClipper>,
    ) -> Self {
        Self {
            transcoder,
            extractor,
            clipper,
        }
    }

    /// The production wiring: FFmpeg engine plus `yt-dlp` for both sources.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let ytdlp = Arc::new(YtDlp::from_config(config));
        Self::new(
            Arc::new(GifTranscoder::with_config(config.engine.clone())),
            ytdlp.clone(),
            ytdlp,
        )
    }
}

/// Build the router. Request bodies are capped at `max_upload_bytes`.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/video/extract-url", post(handlers::extract_video_url))
        .route("/api/video/clip", post(handlers::clip_video))
        .route("/api/video/to-gif/from-url", get(handlers::url_to_gif))
        .route("/api/video/to-gif/from-file", post(handlers::file_to_gif))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `config.bind_address()` and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let state = AppState::from_config(&config);
    let app = create_router(state, config.max_upload_bytes);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(address).await?;
    log::info!("Video Services API listening on http://{address}");
    if config.engine.debug {
        log::info!("Debug diagnostics enabled");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::info!("Shutting down");
    }
}

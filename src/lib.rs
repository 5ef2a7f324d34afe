//! # clipgif
//!
//! Turn short videos into animated GIFs, and serve that conversion (plus
//! post-URL resolution and clip download) over HTTP.
//!
//! The heart of the crate is [`GifTranscoder`]: it takes the raw bytes of a
//! video, decodes it with FFmpeg via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), keeps a subset of
//! frames chosen from the source frame rate, the requested output frame rate
//! and a playback speed, optionally resizes them, and encodes the result as a
//! GIF in memory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clipgif::{ConversionOptions, LoopMode, ResizePercent, SpeedMultiplier};
//!
//! let video = std::fs::read("input.mp4")?;
//! let options = ConversionOptions::new()
//!     .with_resize(ResizePercent::Half)
//!     .with_speed(SpeedMultiplier::Double)
//!     .with_fps(10)
//!     .with_loop_mode(LoopMode::Forever);
//! let gif = clipgif::convert(&video, &options)?;
//! std::fs::write("output.gif", gif)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Inspect a Video
//!
//! ```no_run
//! use std::path::Path;
//!
//! use clipgif::GifTranscoder;
//!
//! let resolved = GifTranscoder::new().resolve_metadata(Path::new("input.mp4"))?;
//! println!(
//!     "{}x{} @ {} fps (from {})",
//!     resolved.metadata.width,
//!     resolved.metadata.height,
//!     resolved.metadata.frames_per_second,
//!     resolved.source,
//! );
//! # Ok::<(), clipgif::PipelineError>(())
//! ```
//!
//! ## How frames are chosen
//!
//! Dimensions and frame rate come from the first rung of a
//! [`MetadataLadder`] that answers: the stream parameters, then the first
//! decoded frame, then `ffprobe`. Every `step`-th source frame is kept, where
//! `step = max(1, floor(source_fps / fps * speed))`, and at most the first
//! [`MAX_SOURCE_FRAMES`](sampling::MAX_SOURCE_FRAMES) source frames are read.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `server` | axum HTTP service and the `clipgif` binary (default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build, and the `ffprobe`
//! and `yt-dlp` programs are used at runtime when present.

pub mod command;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod gif;
pub mod metadata;
pub mod options;
pub mod probe;
pub mod sampling;
pub mod scratch;
#[cfg(feature = "server")]
pub mod server;
pub mod sources;

pub use config::{EngineConfig, ServiceConfig};
pub use decoder::{FirstFrameMetadata, StreamMetadata, VideoInput};
pub use engine::{GifTranscoder, Transcode, convert, default_ladder};
pub use error::{ConversionError, PipelineError, SourceError, ToolError};
pub use ffmpeg::{FfmpegLogLevel, set_log_level};
pub use self::gif::{GifTiming, encode_gif};
pub use metadata::{
    MetadataCandidate, MetadataLadder, MetadataSource, ResolvedMetadata, VideoMetadata,
};
pub use options::{ConversionOptions, LoopMode, ResizePercent, SpeedMultiplier};
pub use probe::FfprobeMetadata;
pub use sampling::{SamplingPlan, frame_step, target_dimensions};
pub use sources::{UrlExtractor, VideoClipper, YtDlp};

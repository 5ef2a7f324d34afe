//! Error types for the `clipgif` crate.
//!
//! The GIF pipeline reports failures at two levels. [`PipelineError`] is the
//! detailed taxonomy raised inside the engine (metadata resolution, frame
//! processing, encoding, external tools). At the engine boundary every
//! pipeline failure is folded into [`ConversionError::ConversionFailed`], so
//! callers only ever need to distinguish bad options from failed conversions.
//!
//! [`ToolError`] covers subprocess execution and [`SourceError`] covers the
//! URL-extraction and clipping collaborators.

use std::{io::Error as IoError, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The error returned by [`GifTranscoder::convert`](crate::GifTranscoder::convert).
///
/// `InvalidOptions` is raised before any I/O happens. Everything else is
/// reported as `ConversionFailed`, whose message carries the underlying cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConversionError {
    /// `fps` or `quality` is outside its accepted range.
    #[error("{0}")]
    InvalidOptions(String),

    /// Decoding, metadata resolution, frame processing, or encoding failed.
    #[error("Failed to convert video to GIF: {0}")]
    ConversionFailed(#[from] PipelineError),
}

impl ConversionError {
    /// Whether the failure originates on the host rather than in the input.
    ///
    /// Scratch-file I/O errors are host-side; a video that cannot be decoded
    /// or options that are out of range are not.
    pub fn is_internal(&self) -> bool {
        matches!(self, ConversionError::ConversionFailed(PipelineError::Io(_)))
    }
}

/// Failures raised inside the GIF pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The decoder could not open the scratch copy of the video.
    #[error("Unable to open video: {0}")]
    DecoderOpen(String),

    /// The container has no video stream.
    #[error("No video stream found in input")]
    NoVideoStream,

    /// Every rung of the metadata ladder failed.
    #[error("Unable to determine video dimensions (last attempt {width}x{height}): {reason}")]
    MetadataUnresolvable {
        /// Last width reported by any metadata source.
        width: f64,
        /// Last height reported by any metadata source.
        height: f64,
        /// Per-source failure summary.
        reason: String,
    },

    /// Scaling the resolved dimensions produced an unusable target size.
    #[error("Invalid resize calculation: {width}x{height}")]
    InvalidTargetSize {
        /// Scaled width before truncation.
        width: f64,
        /// Scaled height before truncation.
        height: f64,
    },

    /// A frame could not be decoded or resized.
    #[error("Frame processing failed: {0}")]
    FrameProcessingFailed(String),

    /// Writing the GIF container failed.
    #[error("GIF encoding failed: {0}")]
    EncodeFailed(String),

    /// The external metadata probe failed.
    #[error("Metadata probe failed: {0}")]
    Probe(#[from] ToolError),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error while staging scratch files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl From<FfmpegError> for PipelineError {
    fn from(error: FfmpegError) -> Self {
        PipelineError::Ffmpeg(error.to_string())
    }
}

/// Failures running an external command-line tool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The binary could not be found on the host.
    #[error("{tool} is not installed or not on PATH")]
    Missing {
        /// Program name or path that was invoked.
        tool: String,
    },

    /// The process did not finish within its time bound and was killed.
    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// Program name or path that was invoked.
        tool: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The process exited with a non-zero status.
    #[error("{tool} exited with status {code}: {stderr}")]
    Failed {
        /// Program name or path that was invoked.
        tool: String,
        /// Exit code, or `-1` when terminated by a signal.
        code: i32,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The process output could not be interpreted.
    #[error("Unable to parse {tool} output: {reason}")]
    InvalidOutput {
        /// Program name or path that was invoked.
        tool: String,
        /// What was wrong with the output.
        reason: String,
    },

    /// Spawning or waiting on the process failed for another reason.
    #[error("Failed to run {tool}: {source}")]
    Io {
        /// Program name or path that was invoked.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: IoError,
    },
}

/// Failures from the URL-extraction and clipping collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The request itself is invalid (bad time range and similar).
    #[error("{0}")]
    InvalidRequest(String),

    /// No direct video URL could be extracted from the post.
    #[error("Failed to extract video URL: {0}")]
    ExtractFailed(String),

    /// The video could not be downloaded or clipped.
    #[error("Failed to clip video: {0}")]
    ClipFailed(String),

    /// Host-side I/O failure while staging the download.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl SourceError {
    /// Whether the failure originates on the host rather than in the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, SourceError::Io(_))
    }
}

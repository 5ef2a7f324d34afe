//! FFmpeg library setup.
//!
//! FFmpeg must be initialised before the first demuxer is opened, and by
//! default it prints warnings straight to stderr. [`initialize`] performs the
//! one-time setup; [`set_log_level`] tunes FFmpeg's own console output, which
//! is separate from the Rust-side `log` records this crate emits.

use std::str::FromStr;
use std::sync::OnceLock;

use ffmpeg_next::util::log::Level;

use crate::error::PipelineError;

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialise the FFmpeg libraries. Safe to call from any thread, any number
/// of times; only the first call does work.
///
/// # Errors
///
/// Returns [`PipelineError::Ffmpeg`] if FFmpeg fails to initialise.
pub fn initialize() -> Result<(), PipelineError> {
    INITIALIZED
        .get_or_init(|| ffmpeg_next::init().map_err(|error| error.to_string()))
        .clone()
        .map_err(|reason| PipelineError::Ffmpeg(format!("initialisation failed: {reason}")))
}

/// Verbosity of FFmpeg's own console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FfmpegLogLevel {
    /// No output.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    #[default]
    Error,
    /// Warnings (FFmpeg's own default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "debug" => Ok(FfmpegLogLevel::Debug),
            other => Err(format!(
                "unknown FFmpeg log level '{other}' (expected quiet, fatal, error, warning, info, debug)"
            )),
        }
    }
}

/// Set FFmpeg's console verbosity. Does not affect `log` output.
pub fn set_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

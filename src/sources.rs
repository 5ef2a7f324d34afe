//! Where videos come from.
//!
//! The HTTP layer needs two collaborators besides the GIF engine: something
//! that turns a social-media post URL into a direct video URL
//! ([`UrlExtractor`]), and something that downloads a time range of a video
//! ([`VideoClipper`]). [`YtDlp`] satisfies both by delegating to the
//! `yt-dlp` command-line tool.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use crate::command::run_with_timeout;
use crate::config::{DEFAULT_TOOL_TIMEOUT, ServiceConfig};
use crate::error::SourceError;
use crate::scratch::ScratchFile;

/// Resolves a post URL to a direct, playable video URL.
pub trait UrlExtractor: Send + Sync {
    /// Extract the direct video URL behind `post_url`.
    fn extract_url(&self, post_url: &str) -> Result<String, SourceError>;
}

/// Downloads the part of a video between two timestamps.
pub trait VideoClipper: Send + Sync {
    /// Download `source_url` trimmed to `start_seconds..end_seconds`.
    fn clip(
        &self,
        source_url: &str,
        start_seconds: f64,
        end_seconds: f64,
    ) -> Result<Vec<u8>, SourceError>;
}

/// Check a clip range: start must be non-negative and before end.
///
/// # Errors
///
/// Returns [`SourceError::InvalidRequest`] describing the violated bound.
pub fn validate_time_range(start_seconds: f64, end_seconds: f64) -> Result<(), SourceError> {
    if !start_seconds.is_finite() || !end_seconds.is_finite() {
        return Err(SourceError::InvalidRequest(
            "Start and end times must be finite".to_string(),
        ));
    }
    if start_seconds < 0.0 {
        return Err(SourceError::InvalidRequest(
            "Start time cannot be negative".to_string(),
        ));
    }
    if end_seconds <= start_seconds {
        return Err(SourceError::InvalidRequest(
            "End time must be greater than start time".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct InfoReport {
    url: Option<String>,
    #[serde(default)]
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    url: Option<String>,
    vcodec: Option<String>,
    height: Option<u32>,
}

/// Pick the direct URL out of a `yt-dlp --dump-single-json` report.
///
/// Prefers the top-level `url`, then the tallest format that carries video,
/// then the first format listed.
pub fn select_video_url(report: &[u8]) -> Result<String, SourceError> {
    let info: InfoReport = serde_json::from_slice(report)
        .map_err(|error| SourceError::ExtractFailed(format!("unreadable report: {error}")))?;

    if let Some(url) = info.url {
        return Ok(url);
    }

    let best_video = info
        .formats
        .iter()
        .filter(|format| format.vcodec.as_deref() != Some("none") && format.url.is_some())
        .max_by_key(|format| format.height.unwrap_or(0));

    best_video
        .or_else(|| info.formats.first())
        .and_then(|format| format.url.clone())
        .ok_or_else(|| {
            SourceError::ExtractFailed("No video URL found in extracted information".to_string())
        })
}

/// [`UrlExtractor`] and [`VideoClipper`] backed by `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    timeout: Duration,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp", DEFAULT_TOOL_TIMEOUT)
    }
}

impl YtDlp {
    /// Use `program`, killing any single invocation after `timeout`.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Use the program and bound from `config`.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.ytdlp_path.clone(), config.tool_timeout)
    }

    fn tool(&self) -> String {
        self.program.display().to_string()
    }
}

impl UrlExtractor for YtDlp {
    fn extract_url(&self, post_url: &str) -> Result<String, SourceError> {
        log::info!("Extracting video URL from {post_url}");
        let mut command = Command::new(&self.program);
        command
            .args(["--dump-single-json", "--skip-download", "--no-warnings", "--quiet"])
            .arg("--")
            .arg(post_url);

        let output = run_with_timeout(&mut command, &self.tool(), self.timeout)
            .map_err(|error| SourceError::ExtractFailed(error.to_string()))?;
        select_video_url(&output.stdout)
    }
}

impl VideoClipper for YtDlp {
    fn clip(
        &self,
        source_url: &str,
        start_seconds: f64,
        end_seconds: f64,
    ) -> Result<Vec<u8>, SourceError> {
        validate_time_range(start_seconds, end_seconds)?;
        log::info!("Clipping {source_url} from {start_seconds}s to {end_seconds}s");

        let output_file = ScratchFile::create("mp4")?;
        let mut command = Command::new(&self.program);
        command
            .args(["--quiet", "--no-warnings", "--force-overwrites"])
            .args(["--format", "best[ext=mp4]/best"])
            .arg("--download-sections")
            .arg(format!("*{start_seconds}-{end_seconds}"))
            .arg("--force-keyframes-at-cuts")
            .arg("--output")
            .arg(output_file.path())
            .arg("--")
            .arg(source_url);

        run_with_timeout(&mut command, &self.tool(), self.timeout)
            .map_err(|error| SourceError::ClipFailed(error.to_string()))?;

        let bytes = output_file.read()?;
        if bytes.is_empty() {
            return Err(SourceError::ClipFailed("download produced no data".to_string()));
        }
        Ok(bytes)
    }
}

//! External metadata probe.
//!
//! [`FfprobeMetadata`] is the last rung of the metadata ladder. It runs
//!
//! ```text
//! ffprobe -v error -select_streams v:0 \
//!     -show_entries stream=width,height,r_frame_rate -of json <file>
//! ```
//!
//! under a time bound and reads the first video stream's width, height, and
//! frame rate from the JSON report.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use crate::command::run_with_timeout;
use crate::config::{DEFAULT_PROBE_TIMEOUT, EngineConfig};
use crate::error::{PipelineError, ToolError};
use crate::metadata::{DEFAULT_FRAMES_PER_SECOND, MetadataCandidate, MetadataSource};

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<f64>,
    height: Option<f64>,
    r_frame_rate: Option<String>,
}

/// Third rung: ask `ffprobe` for the first video stream's parameters.
#[derive(Debug, Clone)]
pub struct FfprobeMetadata {
    program: PathBuf,
    timeout: Duration,
}

impl Default for FfprobeMetadata {
    fn default() -> Self {
        Self::new("ffprobe", DEFAULT_PROBE_TIMEOUT)
    }
}

impl FfprobeMetadata {
    /// Probe with `program`, killing it after `timeout`.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Probe with the program and bound from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.ffprobe_path.clone(), config.probe_timeout)
    }

    /// Run the probe and return its raw report for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Missing`] when the program is not installed,
    /// [`ToolError::Timeout`] when it exceeds its bound,
    /// [`ToolError::Failed`] on a non-zero exit, and
    /// [`ToolError::InvalidOutput`] when the JSON lacks a usable stream.
    pub fn run(&self, path: &Path) -> Result<MetadataCandidate, ToolError> {
        let tool = self.program.display().to_string();
        let mut command = Command::new(&self.program);
        command
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=width,height,r_frame_rate"])
            .args(["-of", "json"])
            .arg(path);

        let output = run_with_timeout(&mut command, &tool, self.timeout)?;
        parse_report(&output.stdout).map_err(|reason| ToolError::InvalidOutput { tool, reason })
    }
}

impl MetadataSource for FfprobeMetadata {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<MetadataCandidate, PipelineError> {
        Ok(self.run(path)?)
    }
}

/// Parse ffprobe's JSON report into a candidate.
pub fn parse_report(stdout: &[u8]) -> Result<MetadataCandidate, String> {
    let report: ProbeReport =
        serde_json::from_slice(stdout).map_err(|error| error.to_string())?;
    let stream = report
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream in report".to_string())?;

    let width = stream
        .width
        .ok_or_else(|| "stream has no width".to_string())?;
    let height = stream
        .height
        .ok_or_else(|| "stream has no height".to_string())?;
    let frames_per_second = match stream.r_frame_rate.as_deref() {
        Some(rate) => Some(parse_frame_rate(rate)?),
        None => None,
    };

    Ok(MetadataCandidate::new(width, height, frames_per_second))
}

/// Evaluate an ffprobe frame rate such as `"30000/1001"` or `"25"`.
///
/// A zero denominator yields [`DEFAULT_FRAMES_PER_SECOND`].
pub fn parse_frame_rate(rate: &str) -> Result<f64, String> {
    let invalid = || format!("invalid frame rate '{rate}'");
    match rate.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = numerator.trim().parse().map_err(|_| invalid())?;
            let denominator: f64 = denominator.trim().parse().map_err(|_| invalid())?;
            if denominator == 0.0 {
                Ok(DEFAULT_FRAMES_PER_SECOND)
            } else {
                Ok(numerator / denominator)
            }
        }
        None => rate.trim().parse().map_err(|_| invalid()),
    }
}

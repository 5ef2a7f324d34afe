//! Video metadata resolution.
//!
//! Decoders do not always report usable stream metadata: some containers
//! come back with zero, missing, or infinite dimensions. The
//! [`MetadataLadder`] asks a fixed list of [`MetadataSource`]s in order and
//! takes the first answer whose dimensions are usable.
//!
//! The default ladder is:
//!
//! 1. [`StreamMetadata`](crate::decoder::StreamMetadata), the decoder's
//!    declared stream parameters.
//! 2. [`FirstFrameMetadata`](crate::decoder::FirstFrameMetadata), the
//!    dimensions of the first decoded frame.
//! 3. [`FfprobeMetadata`](crate::probe::FfprobeMetadata), an external
//!    `ffprobe` call with a time bound.
//!
//! A frame rate reported by an earlier rung is carried forward when a later
//! rung supplies only dimensions. When no rung reports a usable frame rate,
//! [`DEFAULT_FRAMES_PER_SECOND`] is used.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::error::PipelineError;

/// Frame rate assumed when no source reports one.
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 30.0;

/// Authoritative dimensions and frame rate of a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels, always > 0.
    pub width: u32,
    /// Frame height in pixels, always > 0.
    pub height: u32,
    /// Source frames per second, always finite and > 0.
    pub frames_per_second: f64,
}

/// What a single [`MetadataSource`] reported, before validation.
///
/// Dimensions are kept as floats so that missing (`NaN`), zero, negative, and
/// infinite reports can all be represented and rejected uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetadataCandidate {
    /// Reported width.
    pub width: f64,
    /// Reported height.
    pub height: f64,
    /// Reported frame rate, if the source knows one.
    pub frames_per_second: Option<f64>,
}

impl MetadataCandidate {
    /// A candidate with dimensions and a frame rate.
    pub fn new(width: f64, height: f64, frames_per_second: Option<f64>) -> Self {
        Self {
            width,
            height,
            frames_per_second,
        }
    }

    /// Whether both dimensions are finite, positive, and fit in a `u32`.
    pub fn has_valid_dimensions(&self) -> bool {
        is_valid_dimension(self.width) && is_valid_dimension(self.height)
    }

    /// The reported frame rate if it is finite and positive.
    pub fn valid_frames_per_second(&self) -> Option<f64> {
        self.frames_per_second
            .filter(|fps| fps.is_finite() && *fps > 0.0)
    }
}

fn is_valid_dimension(value: f64) -> bool {
    value.is_finite() && value >= 1.0 && value <= f64::from(u32::MAX)
}

/// One rung of the metadata ladder.
pub trait MetadataSource: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Inspect the video at `path`.
    ///
    /// Returning `Ok` with unusable dimensions is allowed; the ladder treats
    /// it the same as an error and moves on.
    fn probe(&self, path: &Path) -> Result<MetadataCandidate, PipelineError>;
}

/// Metadata together with the rung that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedMetadata {
    /// The resolved metadata.
    #[serde(flatten)]
    pub metadata: VideoMetadata,
    /// [`MetadataSource::name`] of the rung that answered.
    pub source: &'static str,
}

/// Ordered chain of [`MetadataSource`]s; the first usable answer wins.
pub struct MetadataLadder {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl std::fmt::Debug for MetadataLadder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|source| source.name()))
            .finish()
    }
}

impl MetadataLadder {
    /// A ladder that tries `sources` in the given order.
    pub fn new(sources: Vec<Box<dyn MetadataSource>>) -> Self {
        Self { sources }
    }

    /// Names of the rungs, in order.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Resolve the metadata of the video at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MetadataUnresolvable`] carrying the last
    /// dimensions any rung reported and a summary of every rung's failure.
    pub fn resolve(&self, path: &Path) -> Result<ResolvedMetadata, PipelineError> {
        let mut known_fps: Option<f64> = None;
        let mut last_dimensions = (f64::NAN, f64::NAN);
        let mut failures = String::new();

        for source in &self.sources {
            let outcome = source.probe(path);
            match outcome {
                Ok(candidate) => {
                    if known_fps.is_none() {
                        known_fps = candidate.valid_frames_per_second();
                    }
                    last_dimensions = (candidate.width, candidate.height);

                    if candidate.has_valid_dimensions() {
                        let metadata = VideoMetadata {
                            width: candidate.width as u32,
                            height: candidate.height as u32,
                            frames_per_second: known_fps.unwrap_or(DEFAULT_FRAMES_PER_SECOND),
                        };
                        log::debug!(
                            "Metadata from {}: {}x{} @ {} fps",
                            source.name(),
                            metadata.width,
                            metadata.height,
                            metadata.frames_per_second,
                        );
                        return Ok(ResolvedMetadata {
                            metadata,
                            source: source.name(),
                        });
                    }

                    log::debug!(
                        "{} reported unusable dimensions {}x{}, trying next source",
                        source.name(),
                        candidate.width,
                        candidate.height,
                    );
                    let _ = write!(
                        failures,
                        "{}{}: invalid dimensions {}x{}",
                        separator(&failures),
                        source.name(),
                        candidate.width,
                        candidate.height,
                    );
                }
                Err(error) => {
                    log::debug!("{} failed: {error}, trying next source", source.name());
                    let _ = write!(failures, "{}{}: {error}", separator(&failures), source.name());
                }
            }
        }

        if failures.is_empty() {
            failures.push_str("no metadata sources configured");
        }

        Err(PipelineError::MetadataUnresolvable {
            width: last_dimensions.0,
            height: last_dimensions.1,
            reason: failures,
        })
    }
}

fn separator(failures: &str) -> &'static str {
    if failures.is_empty() { "" } else { "; " }
}

//! Frame selection and resizing.
//!
//! The output frame rate and speed multiplier are both realised by dropping
//! source frames. A single stride governs which frames survive:
//!
//! ```text
//! frame_step = max(1, floor((source_fps / target_fps) * speed))
//! ```
//!
//! and source frame `i` is kept iff `i % frame_step == 0`. Every GIF frame is
//! shown for the same fixed delay, so a larger stride plays back faster.
//!
//! Kept frames are resized with a Lanczos filter when the output size
//! differs from the source.
//!
//! # Example
//!
//! ```
//! use clipgif::sampling::frame_step;
//!
//! assert_eq!(frame_step(30.0, 8, 1.0), 3);
//! assert_eq!(frame_step(30.0, 8, 2.0), 7);
//! assert_eq!(frame_step(24.0, 10, 0.5), 1);
//! ```

use image::RgbImage;
use image::imageops::{self, FilterType};

use crate::error::PipelineError;
use crate::metadata::VideoMetadata;

/// Hard cap on the number of source frames inspected per conversion.
pub const MAX_SOURCE_FRAMES: usize = 1000;

/// Stride between retained source frames.
///
/// Uses floor, not rounding, and never returns less than 1.
pub fn frame_step(source_fps: f64, target_fps: u32, speed: f64) -> usize {
    if target_fps == 0 {
        return 1;
    }
    let step = (source_fps / f64::from(target_fps) * speed).floor();
    if step.is_finite() && step >= 1.0 {
        step as usize
    } else {
        1
    }
}

/// Output dimensions for `metadata` scaled by `factor`.
///
/// Scaled values are truncated toward zero.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidTargetSize`] if either scaled dimension
/// is not finite or truncates to zero.
pub fn target_dimensions(
    metadata: &VideoMetadata,
    factor: f64,
) -> Result<(u32, u32), PipelineError> {
    let width = f64::from(metadata.width) * factor;
    let height = f64::from(metadata.height) * factor;

    let usable = |value: f64| value.is_finite() && value >= 1.0 && value <= f64::from(u32::MAX);
    if !usable(width) || !usable(height) {
        return Err(PipelineError::InvalidTargetSize { width, height });
    }

    Ok((width as u32, height as u32))
}

/// Resize `frame` to exactly `width` x `height` with a Lanczos filter.
///
/// A frame already at the requested size is returned untouched.
pub fn resize_frame(frame: RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.width() == width && frame.height() == height {
        return frame;
    }
    imageops::resize(&frame, width, height, FilterType::Lanczos3)
}

/// Plan for turning a decoded frame sequence into GIF frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    /// Keep every `step`-th source frame, starting with the first.
    pub step: usize,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Whether kept frames go through the resize filter.
    pub resize: bool,
}

impl SamplingPlan {
    /// Whether source frame `index` is retained.
    pub fn keeps(&self, index: usize) -> bool {
        index % self.step.max(1) == 0
    }

    /// Pull frames from `frames`, keeping and resizing the selected ones.
    ///
    /// At most [`MAX_SOURCE_FRAMES`] source frames are consumed; the rest of
    /// the sequence is left undecoded. Skipped frames are still decoded,
    /// since the decoder only moves forward.
    ///
    /// # Errors
    ///
    /// Stops at the first error the sequence yields and reports it as
    /// [`PipelineError::FrameProcessingFailed`].
    pub fn collect<I>(&self, frames: I) -> Result<Vec<RgbImage>, PipelineError>
    where
        I: IntoIterator<Item = Result<RgbImage, PipelineError>>,
    {
        let mut kept = Vec::new();
        for (index, frame) in frames.into_iter().take(MAX_SOURCE_FRAMES).enumerate() {
            let frame = frame.map_err(|error| match error {
                PipelineError::FrameProcessingFailed(_) => error,
                other => PipelineError::FrameProcessingFailed(other.to_string()),
            })?;
            if !self.keeps(index) {
                continue;
            }
            let frame = if self.resize {
                resize_frame(frame, self.width, self.height)
            } else {
                frame
            };
            kept.push(frame);
        }
        Ok(kept)
    }
}

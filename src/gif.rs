//! GIF encoding.
//!
//! Frames are quantized to a 256-colour palette per frame by the `gif`
//! crate's NeuQuant quantizer. All frames share one delay. The loop
//! (NETSCAPE2.0) extension is written only when a repeat is requested, so an
//! animation without one plays a single pass.

use gif::{Encoder, Frame, Repeat};
use image::RgbImage;

use crate::error::PipelineError;

/// NeuQuant sampling speed passed to the quantizer (1 = best, 30 = fastest).
const QUANTIZER_SPEED: i32 = 10;

/// Timing and loop settings for [`encode_gif`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GifTiming {
    /// Delay between frames in hundredths of a second.
    pub delay_centiseconds: u16,
    /// Loop extension to write; `None` omits it.
    pub repeat: Option<Repeat>,
}

/// Encode `frames` as an animated GIF in memory.
///
/// The canvas takes the first frame's size; every frame must share it.
///
/// # Errors
///
/// Returns [`PipelineError::EncodeFailed`] when there are no frames, the
/// frames are larger than GIF allows, sizes differ, or the encoder fails.
pub fn encode_gif(frames: &[RgbImage], timing: GifTiming) -> Result<Vec<u8>, PipelineError> {
    let first = frames
        .first()
        .ok_or_else(|| PipelineError::EncodeFailed("no frames to encode".to_string()))?;

    let width = u16::try_from(first.width()).map_err(|_| too_large(first))?;
    let height = u16::try_from(first.height()).map_err(|_| too_large(first))?;

    log::debug!(
        "Encoding {} frames to GIF ({width}x{height}, delay={}cs, repeat={:?})",
        frames.len(),
        timing.delay_centiseconds,
        timing.repeat,
    );

    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, width, height, &[]).map_err(|e| {
            PipelineError::EncodeFailed(format!("Failed to create GIF encoder: {e}"))
        })?;

        if let Some(repeat) = timing.repeat {
            encoder.set_repeat(repeat).map_err(|e| {
                PipelineError::EncodeFailed(format!("Failed to set GIF repeat: {e}"))
            })?;
        }

        for image in frames {
            if image.dimensions() != first.dimensions() {
                return Err(PipelineError::EncodeFailed(format!(
                    "frame size {}x{} differs from canvas {width}x{height}",
                    image.width(),
                    image.height(),
                )));
            }

            let mut gif_frame = Frame::from_rgb_speed(width, height, image.as_raw(), QUANTIZER_SPEED);
            gif_frame.delay = timing.delay_centiseconds;

            encoder.write_frame(&gif_frame).map_err(|e| {
                PipelineError::EncodeFailed(format!("Failed to write GIF frame: {e}"))
            })?;
        }
    }

    Ok(buffer)
}

fn too_large(frame: &RgbImage) -> PipelineError {
    PipelineError::EncodeFailed(format!(
        "frame size {}x{} exceeds the GIF limit of 65535",
        frame.width(),
        frame.height(),
    ))
}

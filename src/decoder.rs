//! FFmpeg-backed video decoding.
//!
//! [`VideoInput`] opens a container and locates its best video stream.
//! From there it can report the stream's declared parameters or be turned
//! into a [`FrameIterator`], a lazy, forward-only sequence of RGB frames at
//! source resolution. Frames are decoded one at a time as
//! [`next()`](Iterator::next) is called, so long videos are never buffered.
//!
//! The first two rungs of the metadata ladder live here as well:
//! [`StreamMetadata`] and [`FirstFrameMetadata`].
//!
//! # Example
//!
//! ```no_run
//! use clipgif::decoder::VideoInput;
//!
//! let input = VideoInput::open("input.mp4")?;
//! for frame in input.into_frames()?.take(10) {
//!     let frame = frame?;
//!     println!("{}x{}", frame.width(), frame.height());
//! }
//! # Ok::<(), clipgif::PipelineError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::error::EAGAIN,
};
use image::RgbImage;

use crate::error::PipelineError;
use crate::metadata::{MetadataCandidate, MetadataSource};

/// Consecutive non-EOF demuxer errors tolerated before giving up.
const MAX_READ_ERRORS: u32 = 32;

/// An opened container with a located video stream.
pub struct VideoInput {
    input: Input,
    stream_index: usize,
}

impl VideoInput {
    /// Open `path` and select its best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DecoderOpen`] if FFmpeg cannot open the file
    /// and [`PipelineError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        crate::ffmpeg::initialize()?;

        let input = ffmpeg_next::format::input(&path.as_ref())
            .map_err(|error| PipelineError::DecoderOpen(error.to_string()))?;
        let stream_index = input
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index())
            .ok_or(PipelineError::NoVideoStream)?;

        Ok(Self {
            input,
            stream_index,
        })
    }

    /// Dimensions and frame rate as declared by the stream parameters.
    ///
    /// Zero dimensions are passed through; an unknown frame rate is `None`.
    pub fn declared_metadata(&self) -> Result<MetadataCandidate, PipelineError> {
        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or(PipelineError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let frames_per_second =
            rational_to_fps(stream.avg_frame_rate()).or_else(|| rational_to_fps(stream.rate()));

        Ok(MetadataCandidate::new(
            f64::from(decoder.width()),
            f64::from(decoder.height()),
            frames_per_second,
        ))
    }

    /// Consume the input and decode its video stream from the start.
    pub fn into_frames(self) -> Result<FrameIterator, PipelineError> {
        let stream = self
            .input
            .stream(self.stream_index)
            .ok_or(PipelineError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        Ok(FrameIterator {
            input: self.input,
            decoder,
            stream_index: self.stream_index,
            scaler: None,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            read_errors: 0,
            eof_sent: false,
            done: false,
        })
    }
}

fn rational_to_fps(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 {
        return None;
    }
    let fps = f64::from(rate.numerator()) / f64::from(rate.denominator());
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Pixel-format converter bound to one source geometry.
struct RgbScaler {
    context: ScalingContext,
    format: Pixel,
    width: u32,
    height: u32,
}

/// A lazy, forward-only iterator over decoded frames as RGB images.
///
/// Frames keep their source resolution; resizing is the caller's concern.
/// The iterator ends after the decoder is drained, and stops for good after
/// the first error it yields.
pub struct FrameIterator {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    scaler: Option<RgbScaler>,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    read_errors: u32,
    eof_sent: bool,
    done: bool,
}

impl FrameIterator {
    /// Convert the current `decoded_frame` to a tightly packed RGB image.
    fn convert_current_frame(&mut self) -> Result<RgbImage, PipelineError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();
        if width == 0 || height == 0 {
            return Err(PipelineError::FrameProcessingFailed(format!(
                "decoder produced an empty {width}x{height} frame"
            )));
        }

        // Rebuilt when the stream changes geometry mid-file.
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|s| s.format != format || s.width != width || s.height != height);
        if stale {
            let context = ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some(RgbScaler {
                context,
                format,
                width,
                height,
            });
        }

        if let Some(scaler) = self.scaler.as_mut() {
            scaler.context.run(&self.decoded_frame, &mut self.rgb_frame)?;
        }

        let buffer = frame_to_rgb_buffer(&self.rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            PipelineError::FrameProcessingFailed(
                "decoded frame data does not match its dimensions".to_string(),
            )
        })
    }

    fn fail(&mut self, error: PipelineError) -> Option<Result<RgbImage, PipelineError>> {
        self.done = true;
        let error = match error {
            PipelineError::FrameProcessingFailed(_) => error,
            other => PipelineError::FrameProcessingFailed(other.to_string()),
        };
        Some(Err(error))
    }
}

impl Iterator for FrameIterator {
    type Item = Result<RgbImage, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.decoder.receive_frame(&mut self.decoded_frame) {
                Ok(()) => {
                    return match self.convert_current_frame() {
                        Ok(image) => Some(Ok(image)),
                        Err(error) => self.fail(error),
                    };
                }
                Err(FfmpegError::Eof) => {
                    self.done = true;
                    return None;
                }
                // The decoder wants another packet.
                Err(FfmpegError::Other { errno: EAGAIN }) => {}
                Err(error) => return self.fail(error.into()),
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    self.read_errors = 0;
                    if packet.stream() == self.stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return self.fail(error.into());
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.fail(error.into());
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.read_errors += 1;
                    if self.read_errors >= MAX_READ_ERRORS {
                        return self.fail(error.into());
                    }
                }
            }
        }
    }
}

/// Copy an RGB24 frame into a buffer without FFmpeg's per-row padding.
fn frame_to_rgb_buffer(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        data[..row_bytes * height as usize].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_bytes]);
        }
        buffer
    }
}

/// First rung: the decoder's declared stream parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMetadata;

impl MetadataSource for StreamMetadata {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn probe(&self, path: &Path) -> Result<MetadataCandidate, PipelineError> {
        VideoInput::open(path)?.declared_metadata()
    }
}

/// Second rung: decode the first frame and measure it.
///
/// Reports no frame rate; the ladder carries one forward from the stream
/// rung or falls back to its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFrameMetadata;

impl MetadataSource for FirstFrameMetadata {
    fn name(&self) -> &'static str {
        "first-frame"
    }

    fn probe(&self, path: &Path) -> Result<MetadataCandidate, PipelineError> {
        let first = VideoInput::open(path)?
            .into_frames()?
            .next()
            .transpose()?
            .ok_or_else(|| {
                PipelineError::FrameProcessingFailed("video contains no frames".to_string())
            })?;

        Ok(MetadataCandidate::new(
            f64::from(first.width()),
            f64::from(first.height()),
            None,
        ))
    }
}

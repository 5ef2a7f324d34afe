//! The video-to-GIF engine.
//!
//! [`GifTranscoder::convert`] runs one conversion start to finish on the
//! calling thread:
//!
//! 1. validate the options (no I/O on failure),
//! 2. stage the video bytes in a scratch file,
//! 3. resolve dimensions and frame rate through the [`MetadataLadder`],
//! 4. compute the output size and frame stride,
//! 5. decode, select, and resize frames,
//! 6. encode the GIF in memory.
//!
//! The scratch file is removed on every exit path. The transcoder holds no
//! mutable state, so one instance can serve concurrent calls from many
//! threads.
//!
//! # Example
//!
//! ```no_run
//! use clipgif::{ConversionOptions, GifTranscoder, ResizePercent};
//!
//! let video = std::fs::read("input.mp4")?;
//! let transcoder = GifTranscoder::new();
//! let gif = transcoder.convert(&video, &ConversionOptions::new().with_resize(ResizePercent::Half))?;
//! std::fs::write("output.gif", gif)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt::Arguments;
use std::path::Path;

use crate::config::EngineConfig;
use crate::decoder::{FirstFrameMetadata, StreamMetadata, VideoInput};
use crate::error::{ConversionError, PipelineError};
use crate::gif::{GifTiming, encode_gif};
use crate::metadata::{MetadataLadder, MetadataSource, ResolvedMetadata};
use crate::options::ConversionOptions;
use crate::probe::FfprobeMetadata;
use crate::sampling::{SamplingPlan, frame_step, target_dimensions};
use crate::scratch::ScratchFile;

/// Anything that can turn video bytes into GIF bytes.
///
/// The HTTP layer depends on this seam rather than on [`GifTranscoder`]
/// directly, so handlers can be exercised without FFmpeg.
pub trait Transcode: Send + Sync {
    /// Convert `video` to an animated GIF.
    fn transcode(
        &self,
        video: &[u8],
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError>;
}

/// Synchronous video-to-GIF converter.
#[derive(Debug)]
pub struct GifTranscoder {
    config: EngineConfig,
    ladder: MetadataLadder,
}

impl Default for GifTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GifTranscoder {
    /// A transcoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// A transcoder with the standard ladder: stream parameters, first
    /// frame, then `ffprobe` as configured.
    pub fn with_config(config: EngineConfig) -> Self {
        let ladder = default_ladder(&config);
        Self { config, ladder }
    }

    /// A transcoder with a custom metadata ladder.
    pub fn with_ladder(config: EngineConfig, ladder: MetadataLadder) -> Self {
        Self { config, ladder }
    }

    /// The configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve metadata for a video file on disk through the ladder.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MetadataUnresolvable`] when no rung succeeds.
    pub fn resolve_metadata(&self, path: &Path) -> Result<ResolvedMetadata, PipelineError> {
        self.ladder.resolve(path)
    }

    /// Convert `video` to an animated GIF.
    ///
    /// # Errors
    ///
    /// - [`ConversionError::InvalidOptions`] if `fps` or `quality` is out of
    ///   range; nothing is written or decoded.
    /// - [`ConversionError::ConversionFailed`] for any failure after that.
    pub fn convert(
        &self,
        video: &[u8],
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        options.validate()?;
        self.diagnostic(format_args!(
            "Converting {} bytes (resize={}, speed={}, fps={}, quality={}, loop={})",
            video.len(),
            options.resize,
            options.speed,
            options.fps,
            options.quality,
            options.loop_mode,
        ));

        let scratch = ScratchFile::with_bytes(video, "mp4").map_err(PipelineError::from)?;
        let result = self.run_pipeline(scratch.path(), options);
        drop(scratch);

        match &result {
            Ok(gif) => self.diagnostic(format_args!("Conversion produced {} bytes", gif.len())),
            Err(error) => log::warn!("Conversion failed: {error}"),
        }
        result.map_err(ConversionError::from)
    }

    fn run_pipeline(
        &self,
        path: &Path,
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, PipelineError> {
        let resolved = self.ladder.resolve(path)?;
        let metadata = resolved.metadata;
        self.diagnostic(format_args!(
            "Resolved {}x{} @ {} fps via {}",
            metadata.width, metadata.height, metadata.frames_per_second, resolved.source,
        ));

        let factor = options.resize.factor();
        let (width, height) = target_dimensions(&metadata, factor)?;
        let step = frame_step(metadata.frames_per_second, options.fps, options.speed.factor());
        let plan = SamplingPlan {
            step,
            width,
            height,
            resize: factor != 1.0,
        };
        self.diagnostic(format_args!(
            "Output {width}x{height}, keeping every {step} frame(s)"
        ));

        let frames = plan.collect(VideoInput::open(path)?.into_frames()?)?;
        self.diagnostic(format_args!("Selected {} frames", frames.len()));

        let timing = GifTiming {
            delay_centiseconds: options.frame_delay_centiseconds(),
            repeat: options.loop_mode.repeat(),
        };
        encode_gif(&frames, timing)
    }

    fn diagnostic(&self, message: Arguments<'_>) {
        if self.config.debug {
            log::info!("{message}");
        } else {
            log::debug!("{message}");
        }
    }
}

impl Transcode for GifTranscoder {
    fn transcode(
        &self,
        video: &[u8],
        options: &ConversionOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        self.convert(video, options)
    }
}

/// The standard three-rung ladder for `config`.
pub fn default_ladder(config: &EngineConfig) -> MetadataLadder {
    let sources: Vec<Box<dyn MetadataSource>> = vec![
        Box::new(StreamMetadata),
        Box::new(FirstFrameMetadata),
        Box::new(FfprobeMetadata::from_config(config)),
    ];
    MetadataLadder::new(sources)
}

/// Convert `video` with a default [`GifTranscoder`].
pub fn convert(video: &[u8], options: &ConversionOptions) -> Result<Vec<u8>, ConversionError> {
    GifTranscoder::new().convert(video, options)
}

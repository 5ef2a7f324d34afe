//! GIF conversion options.
//!
//! [`ConversionOptions`] carries the five knobs a caller can turn: output
//! size, playback speed, output frame rate, quality, and loop behaviour. The
//! enumerated knobs parse from (and serialize to) the same strings the HTTP
//! API accepts, e.g. `"50%"`, `"2x"`, `"forever"`.
//!
//! # Example
//!
//! ```
//! use clipgif::{ConversionOptions, LoopMode, ResizePercent, SpeedMultiplier};
//!
//! let options = ConversionOptions::new()
//!     .with_resize(ResizePercent::Half)
//!     .with_speed(SpeedMultiplier::Double)
//!     .with_fps(10)
//!     .with_loop_mode(LoopMode::Once);
//!
//! assert!(options.validate().is_ok());
//! assert_eq!(options.frame_duration_ms(), 100);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::RangeInclusive;
use std::str::FromStr;

use gif::Repeat;
use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Accepted output frame rates.
pub const FPS_RANGE: RangeInclusive<u32> = 3..=10;

/// Accepted quality values.
pub const QUALITY_RANGE: RangeInclusive<u32> = 0..=100;

/// Output size as a percentage of the source resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResizePercent {
    /// 25% of the source size.
    #[serde(rename = "25%")]
    Quarter,
    /// 50% of the source size.
    #[serde(rename = "50%")]
    Half,
    /// 75% of the source size.
    #[serde(rename = "75%")]
    ThreeQuarters,
    /// Source size.
    #[default]
    #[serde(rename = "100%")]
    Full,
}

impl ResizePercent {
    /// The percentage as an integer.
    pub fn percent(self) -> u32 {
        match self {
            ResizePercent::Quarter => 25,
            ResizePercent::Half => 50,
            ResizePercent::ThreeQuarters => 75,
            ResizePercent::Full => 100,
        }
    }

    /// Scale factor applied to each source dimension.
    pub fn factor(self) -> f64 {
        f64::from(self.percent()) / 100.0
    }
}

impl Display for ResizePercent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}%", self.percent())
    }
}

impl FromStr for ResizePercent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "25%" => Ok(ResizePercent::Quarter),
            "50%" => Ok(ResizePercent::Half),
            "75%" => Ok(ResizePercent::ThreeQuarters),
            "100%" => Ok(ResizePercent::Full),
            other => Err(format!(
                "Invalid resize '{other}' (expected one of 25%, 50%, 75%, 100%)"
            )),
        }
    }
}

/// Playback speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpeedMultiplier {
    /// Half speed.
    #[serde(rename = "0.5x")]
    Half,
    /// Original speed.
    #[default]
    #[serde(rename = "1x")]
    Normal,
    /// Double speed.
    #[serde(rename = "2x")]
    Double,
    /// Quadruple speed.
    #[serde(rename = "4x")]
    Quadruple,
}

impl SpeedMultiplier {
    /// The multiplier as a float.
    pub fn factor(self) -> f64 {
        match self {
            SpeedMultiplier::Half => 0.5,
            SpeedMultiplier::Normal => 1.0,
            SpeedMultiplier::Double => 2.0,
            SpeedMultiplier::Quadruple => 4.0,
        }
    }
}

impl Display for SpeedMultiplier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            SpeedMultiplier::Half => "0.5x",
            SpeedMultiplier::Normal => "1x",
            SpeedMultiplier::Double => "2x",
            SpeedMultiplier::Quadruple => "4x",
        };
        f.write_str(label)
    }
}

impl FromStr for SpeedMultiplier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "0.5x" => Ok(SpeedMultiplier::Half),
            "1x" => Ok(SpeedMultiplier::Normal),
            "2x" => Ok(SpeedMultiplier::Double),
            "4x" => Ok(SpeedMultiplier::Quadruple),
            other => Err(format!(
                "Invalid speed '{other}' (expected one of 0.5x, 1x, 2x, 4x)"
            )),
        }
    }
}

/// How the finished GIF repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Loop indefinitely (loop count 0).
    #[default]
    Forever,
    /// Repeat exactly once (loop count 1).
    Once,
    /// Omit the loop extension; the animation plays a single pass.
    None,
}

impl LoopMode {
    /// The loop extension to write, or `None` to omit it.
    pub fn repeat(self) -> Option<Repeat> {
        match self {
            LoopMode::Forever => Some(Repeat::Infinite),
            LoopMode::Once => Some(Repeat::Finite(1)),
            LoopMode::None => None,
        }
    }
}

impl Display for LoopMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let label = match self {
            LoopMode::Forever => "forever",
            LoopMode::Once => "once",
            LoopMode::None => "none",
        };
        f.write_str(label)
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "forever" => Ok(LoopMode::Forever),
            "once" => Ok(LoopMode::Once),
            "none" => Ok(LoopMode::None),
            other => Err(format!(
                "Invalid loop '{other}' (expected one of forever, once, none)"
            )),
        }
    }
}

/// Settings for a single video-to-GIF conversion.
///
/// Defaults match the HTTP API: `100%`, `1x`, 8 fps, quality 75, loop
/// forever. `quality` is range-checked but does not change the encoder's
/// palette or compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Output size relative to the source.
    pub resize: ResizePercent,
    /// Playback speed multiplier.
    pub speed: SpeedMultiplier,
    /// Output frame rate, 3 to 10.
    pub fps: u32,
    /// Quality hint, 0 to 100.
    pub quality: u32,
    /// Loop behaviour.
    #[serde(rename = "loop")]
    pub loop_mode: LoopMode,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            resize: ResizePercent::Full,
            speed: SpeedMultiplier::Normal,
            fps: 8,
            quality: 75,
            loop_mode: LoopMode::Forever,
        }
    }
}

impl ConversionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output size.
    pub fn with_resize(mut self, resize: ResizePercent) -> Self {
        self.resize = resize;
        self
    }

    /// Set the playback speed.
    pub fn with_speed(mut self, speed: SpeedMultiplier) -> Self {
        self.speed = speed;
        self
    }

    /// Set the output frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Set the quality hint.
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality;
        self
    }

    /// Set the loop behaviour.
    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    /// Check the numeric options.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidOptions`] when `fps` is outside
    /// 3..=10 or `quality` is outside 0..=100.
    pub fn validate(&self) -> Result<(), ConversionError> {
        if !FPS_RANGE.contains(&self.fps) {
            return Err(ConversionError::InvalidOptions(format!(
                "FPS must be between {} and {}",
                FPS_RANGE.start(),
                FPS_RANGE.end()
            )));
        }
        if !QUALITY_RANGE.contains(&self.quality) {
            return Err(ConversionError::InvalidOptions(format!(
                "Quality must be between {} and {}",
                QUALITY_RANGE.start(),
                QUALITY_RANGE.end()
            )));
        }
        Ok(())
    }

    /// Display time of every output frame, `floor(1000 / fps)` milliseconds.
    pub fn frame_duration_ms(&self) -> u32 {
        1000 / self.fps.max(1)
    }

    /// Frame delay in the GIF's native unit of hundredths of a second.
    ///
    /// GIF cannot store milliseconds, so the duration is rounded half to
    /// even: 125 ms becomes 12, 166 ms becomes 17.
    pub fn frame_delay_centiseconds(&self) -> u16 {
        let ms = self.frame_duration_ms();
        let (whole, remainder) = (ms / 10, ms % 10);
        let rounded = if remainder > 5 || (remainder == 5 && whole % 2 == 1) {
            whole + 1
        } else {
            whole
        };
        u16::try_from(rounded).unwrap_or(u16::MAX)
    }
}

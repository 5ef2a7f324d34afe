//! Engine and service configuration.
//!
//! [`EngineConfig`] holds the settings the GIF engine reads once per call:
//! the debug flag and how to run the external metadata probe.
//! [`ServiceConfig`] wraps it with the HTTP service settings. Both load from
//! environment variables and expose `with_*` setters for overrides.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use clipgif::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_debug(true)
//!     .with_probe_timeout(Duration::from_secs(10));
//! assert!(config.debug);
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on the external metadata probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on the download/clip tool.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default upload limit for the file-to-GIF endpoint, in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 200;

/// Settings read by [`GifTranscoder`](crate::GifTranscoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Raise pipeline diagnostics from `debug` to `info` level.
    pub debug: bool,
    /// Program used for the last metadata fallback.
    pub ffprobe_path: PathBuf,
    /// Time bound on the metadata probe.
    pub probe_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            ffprobe_path: PathBuf::from("ffprobe"),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `DEBUG`, `CLIPGIF_FFPROBE`, and `CLIPGIF_PROBE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            debug: lookup("DEBUG").is_some_and(|value| is_truthy(&value)),
            ffprobe_path: lookup("CLIPGIF_FFPROBE")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            probe_timeout: parse_seconds(lookup("CLIPGIF_PROBE_TIMEOUT_SECS"))
                .unwrap_or(defaults.probe_timeout),
        }
    }

    /// Enable or disable pipeline diagnostics.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the program used for the metadata probe.
    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = path.into();
        self
    }

    /// Set the metadata probe time bound.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Interface to bind.
    pub host: IpAddr,
    /// Port to bind.
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
    /// Program used for URL extraction and clipping.
    pub ytdlp_path: PathBuf,
    /// Time bound on a single extraction or clip.
    pub tool_timeout: Duration,
    /// Settings passed through to the GIF engine.
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            ytdlp_path: PathBuf::from("yt-dlp"),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `CLIPGIF_*` variables plus everything [`EngineConfig::from_env`] reads.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("CLIPGIF_HOST")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.host),
            port: lookup("CLIPGIF_PORT")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.port),
            max_upload_bytes: lookup("CLIPGIF_MAX_UPLOAD_MB")
                .and_then(|value| value.trim().parse::<usize>().ok())
                .filter(|megabytes| *megabytes > 0)
                .map(|megabytes| megabytes * 1024 * 1024)
                .unwrap_or(defaults.max_upload_bytes),
            ytdlp_path: lookup("CLIPGIF_YTDLP")
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_path),
            tool_timeout: parse_seconds(lookup("CLIPGIF_TOOL_TIMEOUT_SECS"))
                .unwrap_or(defaults.tool_timeout),
            engine: EngineConfig::from_lookup(lookup),
        }
    }

    /// Set the bind interface.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the bind port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Socket address built from `host` and `port`.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn parse_seconds(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|seconds| *seconds > 0)
        .map(Duration::from_secs)
}

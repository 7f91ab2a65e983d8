//! Configuration for compressed streams.

use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest window log zstd accepts.
pub const MIN_WINDOW_LOG: u32 = 10;

/// Largest window log zstd accepts on 64-bit targets.
pub const MAX_WINDOW_LOG: u32 = 31;

/// When the compressor is asked to emit buffered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Only on an explicit flush or close
    Buffered,
    /// After every write, so each write is decodable by the peer on arrival
    EveryWrite,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::Buffered
    }
}

/// Compression parameters applied when a stream is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// zstd compression level
    pub level: i32,

    /// Compressor window size as a power of two
    pub window_log: Option<u32>,

    /// Largest window the decompressor will accept
    pub max_window_log: Option<u32>,

    /// Append a content checksum to each frame
    pub checksum: bool,

    pub flush_policy: FlushPolicy,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
            window_log: None,
            max_window_log: None,
            checksum: false,
            flush_policy: FlushPolicy::Buffered,
        }
    }
}

impl CompressionConfig {
    /// Default parameters at the given compression level.
    pub fn with_level(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Checks every parameter against the bounds the engine accepts.
    pub fn validate(&self) -> Result<()> {
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.level) {
            return Err(StreamError::Configuration(format!(
                "compression level {} outside {}..={}",
                self.level,
                levels.start(),
                levels.end()
            )));
        }

        for (name, value) in [
            ("window_log", self.window_log),
            ("max_window_log", self.max_window_log),
        ] {
            if let Some(log) = value {
                if !(MIN_WINDOW_LOG..=MAX_WINDOW_LOG).contains(&log) {
                    return Err(StreamError::Configuration(format!(
                        "{} {} outside {}..={}",
                        name, log, MIN_WINDOW_LOG, MAX_WINDOW_LOG
                    )));
                }
            }
        }

        if let (Some(window), Some(max)) = (self.window_log, self.max_window_log) {
            if window > max {
                tracing::warn!(
                    window_log = window,
                    max_window_log = max,
                    "peer with the same limits will reject this stream"
                );
            }
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StreamError::Configuration(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| StreamError::Configuration(format!("failed to serialize: {}", e)))
    }
}

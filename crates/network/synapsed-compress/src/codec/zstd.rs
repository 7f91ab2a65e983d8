//! Zstandard engine behind the `Encode`/`Decode` traits

use super::{Decode, Direction, Encode, Progress, Status};
use crate::config::CompressionConfig;
use crate::error::{CodecError, CodecErrorKind};
use std::fmt;
use std::io;
use zstd::stream::raw::{CParameter, DParameter, Decoder, Encoder, InBuffer, Operation, OutBuffer};
use zstd::zstd_safe::{CCtx, DCtx};

const ENGINE_NAME: &str = "zstd";

/// Error names returned by `ZSTD_getErrorName` (lib/common/error_private.c)
/// for the codes this layer distinguishes.
const KNOWN_ERRORS: &[(&str, CodecErrorKind)] = &[
    // ZSTD_error_frameParameter_windowTooLarge
    ("Frame requires too much memory for decoding", CodecErrorKind::ResourceLimitExceeded),
    // ZSTD_error_memory_allocation
    ("Allocation error : not enough memory", CodecErrorKind::ResourceLimitExceeded),
    // ZSTD_error_version_unsupported
    ("Version not supported", CodecErrorKind::UnsupportedFormat),
    // ZSTD_error_frameParameter_unsupported
    ("Unsupported frame parameter", CodecErrorKind::UnsupportedFormat),
    // ZSTD_error_prefix_unknown
    ("Unknown frame descriptor", CodecErrorKind::Corrupt),
    // ZSTD_error_corruption_detected
    ("Data corruption detected", CodecErrorKind::Corrupt),
    // ZSTD_error_checksum_wrong
    ("Restored data doesn't match checksum", CodecErrorKind::Corrupt),
    // ZSTD_error_srcSize_wrong
    ("Src size is incorrect", CodecErrorKind::Corrupt),
];

/// Maps a zstd failure onto the codec error taxonomy.
///
/// The `zstd` crate reports failures as `io::Error` carrying only the
/// engine's error name, so the category is recovered from that name. Names
/// outside `KNOWN_ERRORS` fall back to keyword matching.
pub(crate) fn classify(direction: Direction, err: io::Error) -> CodecError {
    let reason = err.to_string();

    let kind = KNOWN_ERRORS
        .iter()
        .find(|(name, _)| reason.contains(name))
        .map(|&(_, kind)| kind)
        .unwrap_or_else(|| {
            let lower = reason.to_ascii_lowercase();
            if lower.contains("memory") || lower.contains("too large") || lower.contains("too much") {
                CodecErrorKind::ResourceLimitExceeded
            } else if lower.contains("unsupported") || lower.contains("not supported") || lower.contains("version") {
                CodecErrorKind::UnsupportedFormat
            } else {
                CodecErrorKind::Corrupt
            }
        });

    CodecError::new(kind, direction, reason)
}

/// Streaming zstd compressor
pub struct ZstdEncoder {
    inner: Encoder<'static>,
    level: i32,
}

impl ZstdEncoder {
    /// Creates a compressor at the given level with default parameters.
    pub fn new(level: i32) -> Result<Self, CodecError> {
        let inner = Encoder::new(level).map_err(|e| classify(Direction::Compress, e))?;
        Ok(Self { inner, level })
    }

    /// Creates a compressor with level, window and checksum taken from `config`.
    pub fn from_config(config: &CompressionConfig) -> Result<Self, CodecError> {
        let mut encoder = Self::new(config.level)?;
        if let Some(window_log) = config.window_log {
            encoder.set_parameter(CParameter::WindowLog(window_log))?;
        }
        if config.checksum {
            encoder.set_parameter(CParameter::ChecksumFlag(true))?;
        }
        Ok(encoder)
    }

    /// Applies a raw zstd compression parameter.
    pub fn set_parameter(&mut self, parameter: CParameter) -> Result<(), CodecError> {
        self.inner
            .set_parameter(parameter)
            .map_err(|e| classify(Direction::Compress, e))
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl fmt::Debug for ZstdEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdEncoder")
            .field("level", &self.level)
            .finish()
    }
}

impl Encode for ZstdEncoder {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let status = self
            .inner
            .run_on_buffers(input, output)
            .map_err(|e| classify(Direction::Compress, e))?;

        let output_full = !output.is_empty() && status.bytes_written == output.len();
        let next = if output_full || status.bytes_read < input.len() {
            Status::Continue
        } else {
            Status::NeedsInput
        };

        Ok(Progress::new(status.bytes_read, status.bytes_written, next))
    }

    fn flush(&mut self, output: &mut [u8]) -> Result<Progress, CodecError> {
        let mut out = OutBuffer::around(output);
        let remaining = self
            .inner
            .flush(&mut out)
            .map_err(|e| classify(Direction::Compress, e))?;

        let next = if remaining == 0 {
            Status::NeedsInput
        } else {
            Status::Continue
        };
        Ok(Progress::new(0, out.pos(), next))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, CodecError> {
        let mut out = OutBuffer::around(output);
        let remaining = self
            .inner
            .finish(&mut out, false)
            .map_err(|e| classify(Direction::Compress, e))?;

        let next = if remaining == 0 {
            Status::Done
        } else {
            Status::Continue
        };
        Ok(Progress::new(0, out.pos(), next))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        self.inner
            .reinit()
            .map_err(|e| classify(Direction::Compress, e))
    }

    fn recommended_chunk_size(&self) -> usize {
        CCtx::out_size()
    }

    fn name(&self) -> &'static str {
        ENGINE_NAME
    }
}

/// Streaming zstd decompressor
pub struct ZstdDecoder {
    inner: Decoder<'static>,
}

impl ZstdDecoder {
    pub fn new() -> Result<Self, CodecError> {
        let inner = Decoder::new().map_err(|e| classify(Direction::Decompress, e))?;
        Ok(Self { inner })
    }

    /// Creates a decompressor honoring the window limit in `config`.
    pub fn from_config(config: &CompressionConfig) -> Result<Self, CodecError> {
        let mut decoder = Self::new()?;
        if let Some(max_window_log) = config.max_window_log {
            decoder.set_parameter(DParameter::WindowLogMax(max_window_log))?;
        }
        Ok(decoder)
    }

    /// Applies a raw zstd decompression parameter.
    pub fn set_parameter(&mut self, parameter: DParameter) -> Result<(), CodecError> {
        self.inner
            .set_parameter(parameter)
            .map_err(|e| classify(Direction::Decompress, e))
    }
}

impl fmt::Debug for ZstdDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZstdDecoder").finish_non_exhaustive()
    }
}

impl Decode for ZstdDecoder {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let mut src = InBuffer::around(input);
        let mut dst = OutBuffer::around(output);
        let hint = self
            .inner
            .run(&mut src, &mut dst)
            .map_err(|e| classify(Direction::Decompress, e))?;

        let consumed = src.pos;
        let produced = dst.pos();
        let output_full = !output.is_empty() && produced == output.len();

        // hint == 0: the frame is fully decoded and flushed
        let next = if hint == 0 {
            Status::FrameComplete
        } else if output_full {
            Status::Continue
        } else {
            Status::NeedsInput
        };

        Ok(Progress::new(consumed, produced, next))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        self.inner
            .reinit()
            .map_err(|e| classify(Direction::Decompress, e))
    }

    fn recommended_chunk_size(&self) -> usize {
        DCtx::in_size()
    }

    fn name(&self) -> &'static str {
        ENGINE_NAME
    }
}

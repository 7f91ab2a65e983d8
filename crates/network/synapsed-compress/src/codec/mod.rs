//! Streaming codec abstraction
//!
//! An engine is driven with an input slice and an output slice and reports
//! how much of each it used. The engine keeps its own internal state between
//! calls, so input must never be supplied twice.

pub mod zstd;

use crate::error::CodecError;
use std::fmt;

pub use self::zstd::{ZstdDecoder, ZstdEncoder};

/// Which way the data flows through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Compress,
    Decompress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Compress => "compress",
            Direction::Decompress => "decompress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine status after one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The output slice filled up; call again (with empty input) to drain more
    Continue,
    /// All supplied input was consumed and no output is pending
    NeedsInput,
    /// The decompressor reached the end of a frame
    FrameComplete,
    /// The compressor wrote the complete frame trailer
    Done,
}

/// Result of one engine step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed by this step
    pub consumed: usize,
    /// Output bytes produced by this step
    pub produced: usize,
    pub status: Status,
}

impl Progress {
    pub fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }
}

/// Compression half of a streaming engine
pub trait Encode: Send + fmt::Debug {
    /// Compresses as much of `input` as fits into `output`.
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError>;

    /// Emits everything buffered so far as a decodable block without ending the frame.
    ///
    /// Returns `Continue` while more flushed output is pending.
    fn flush(&mut self, output: &mut [u8]) -> Result<Progress, CodecError>;

    /// Writes the frame epilogue. Returns `Done` once the trailer is fully produced.
    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, CodecError>;

    /// Drops all internal state and starts a new frame.
    fn reset(&mut self) -> Result<(), CodecError>;

    /// Output chunk size the engine handles most efficiently
    fn recommended_chunk_size(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Decompression half of a streaming engine
pub trait Decode: Send + fmt::Debug {
    /// Decompresses as much of `input` as fits into `output`.
    ///
    /// Returns `FrameComplete` when the end of the current frame was decoded
    /// and flushed into `output`.
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError>;

    /// Drops all internal state and waits for a new frame.
    fn reset(&mut self) -> Result<(), CodecError>;

    /// Input chunk size the engine handles most efficiently
    fn recommended_chunk_size(&self) -> usize;

    fn name(&self) -> &'static str;
}

impl<E: Encode + ?Sized> Encode for Box<E> {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        (**self).advance(input, output)
    }

    fn flush(&mut self, output: &mut [u8]) -> Result<Progress, CodecError> {
        (**self).flush(output)
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, CodecError> {
        (**self).finish(output)
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        (**self).reset()
    }

    fn recommended_chunk_size(&self) -> usize {
        (**self).recommended_chunk_size()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<D: Decode + ?Sized> Decode for Box<D> {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        (**self).advance(input, output)
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        (**self).reset()
    }

    fn recommended_chunk_size(&self) -> usize {
        (**self).recommended_chunk_size()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

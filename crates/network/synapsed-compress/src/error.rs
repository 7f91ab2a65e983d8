//! Error types for the compression layer.

use crate::codec::Direction;
use std::fmt;
use std::io;
use thiserror::Error;

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Main error type for compressed stream operations.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Error reported by the wrapped transport, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(#[source] io::Error),

    /// Error reported by the compression engine
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The transport ended in the middle of a compressed frame
    #[error("Compressed stream truncated: end of input inside a frame")]
    TruncatedStream,

    /// The caller used the stream in a way its contract forbids
    #[error("Protocol misuse: {0}")]
    ProtocolMisuse(Misuse),

    /// Invalid construction-time parameters
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Categories of engine failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecErrorKind {
    /// The compressed input is damaged or is not a compressed stream at all
    Corrupt,
    /// The input uses a format version or feature the engine cannot decode
    UnsupportedFormat,
    /// Decoding would exceed a memory or window limit
    ResourceLimitExceeded,
}

impl fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecErrorKind::Corrupt => write!(f, "corrupt"),
            CodecErrorKind::UnsupportedFormat => write!(f, "unsupported_format"),
            CodecErrorKind::ResourceLimitExceeded => write!(f, "resource_limit_exceeded"),
        }
    }
}

/// Error produced by a compression or decompression engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} ({direction}): {reason}")]
pub struct CodecError {
    kind: CodecErrorKind,
    direction: Direction,
    reason: String,
}

impl CodecError {
    /// Creates a new codec error.
    pub fn new(kind: CodecErrorKind, direction: Direction, reason: impl Into<String>) -> Self {
        Self {
            kind,
            direction,
            reason: reason.into(),
        }
    }

    /// Returns the failure category.
    pub fn kind(&self) -> CodecErrorKind {
        self.kind
    }

    /// Returns the direction whose engine failed.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the engine's description of the failure.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Ways a caller can violate the stream contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misuse {
    /// A write was issued after the compressed frame was finished
    WriteAfterClose,
    /// An operation was issued on a direction that already failed
    Poisoned(Direction),
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Misuse::WriteAfterClose => write!(f, "write after the compressed frame was finished"),
            Misuse::Poisoned(direction) => {
                write!(f, "{} direction failed earlier; reset() is required", direction)
            }
        }
    }
}

/// Error severity levels for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The stream cannot be used without a reset
    Critical,
    /// The operation failed but the stream may continue after caller action
    Major,
    /// Caller error with no effect on stream state
    Minor,
}

impl StreamError {
    /// Returns the severity of this error for observability purposes.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StreamError::Codec(_) => ErrorSeverity::Critical,
            StreamError::TruncatedStream => ErrorSeverity::Critical,
            StreamError::Transport(_) => ErrorSeverity::Major,
            StreamError::Configuration(_) => ErrorSeverity::Major,
            StreamError::ProtocolMisuse(_) => ErrorSeverity::Minor,
        }
    }

    /// Returns a short label suitable for log fields and metrics.
    pub fn observable_type(&self) -> &'static str {
        match self {
            StreamError::Transport(_) => "transport",
            StreamError::Codec(_) => "codec",
            StreamError::TruncatedStream => "truncated_stream",
            StreamError::ProtocolMisuse(_) => "protocol_misuse",
            StreamError::Configuration(_) => "configuration",
        }
    }

    /// Returns the codec failure category, if this is a codec error.
    pub fn codec_kind(&self) -> Option<CodecErrorKind> {
        match self {
            StreamError::Codec(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Recovers a `StreamError` from an `io::Error` produced by the I/O trait
    /// implementations. Transport errors are passed through unchanged and are
    /// therefore not recoverable this way.
    pub fn from_io(err: &io::Error) -> Option<&StreamError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<StreamError>())
    }

    /// Converts into an `io::Error` for the `AsyncRead`/`AsyncWrite` surface.
    pub fn into_io(self) -> io::Error {
        let kind = match self {
            StreamError::Transport(e) => return e,
            StreamError::Codec(_) => io::ErrorKind::InvalidData,
            StreamError::TruncatedStream => io::ErrorKind::UnexpectedEof,
            StreamError::Configuration(_) => io::ErrorKind::InvalidInput,
            StreamError::ProtocolMisuse(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        err.into_io()
    }
}

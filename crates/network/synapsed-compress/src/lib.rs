//! # Synapsed-Compress
//!
//! Transparent streaming compression for async byte-stream transports.
//!
//! [`CompressedStream`] wraps any transport (a TCP socket, a TLS stream, an
//! in-memory pipe, another wrapper) and presents the same read/write surface.
//! Everything written is compressed into a single zstd frame on the way out;
//! everything read is decompressed on the way in.
//!
//! ## Architecture
//!
//! - **Codec**: the `Encode`/`Decode` engine traits and the zstd engine
//! - **Session**: an engine plus the staging buffer between it and the transport
//! - **Composer**: the read and write state machines that interleave codec
//!   steps with transport polls
//! - **Stream**: the wrapper tying both directions to one transport
//!
//! ## Example
//!
//! ```no_run
//! use synapsed_compress::CompressedStream;
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//! use tokio::net::TcpStream;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let tcp = TcpStream::connect("127.0.0.1:7000").await?;
//! let mut stream = CompressedStream::new(tcp)?;
//!
//! stream.write_all(b"hello world").await?;
//! stream.flush().await?;
//!
//! let mut reply = [0u8; 64];
//! let n = stream.read(&mut reply).await?;
//! println!("{}", String::from_utf8_lossy(&reply[..n]));
//!
//! stream.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod codec;
pub mod composer;
pub mod config;
pub mod error;
pub mod session;
pub mod statistics;
pub mod stream;
pub mod transport;

pub use codec::{Decode, Direction, Encode, Progress, Status, ZstdDecoder, ZstdEncoder};
pub use composer::{CloseState, ReadState, WriteState};
pub use config::{CompressionConfig, FlushPolicy};
pub use error::{CodecError, CodecErrorKind, ErrorSeverity, Misuse, Result, StreamError};
pub use statistics::{StatisticsSnapshot, StreamStatistics};
pub use stream::CompressedStream;
pub use transport::Transport;

#[cfg(feature = "futures-io")]
pub use transport::FuturesIo;

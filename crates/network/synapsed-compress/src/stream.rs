//! Transparent compression over a byte-stream transport.

use crate::codec::{Decode, Encode, ZstdDecoder, ZstdEncoder};
use crate::composer::{CloseState, ReadComposer, ReadState, WriteComposer, WriteState};
use crate::config::CompressionConfig;
use crate::error::Result;
use crate::session::{DecodeSession, EncodeSession};
use crate::statistics::{StatisticsSnapshot, StreamStatistics};
use crate::transport::Transport;
use futures::future::poll_fn;
use pin_project_lite::pin_project;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::debug;

pin_project! {
    /// A stream that compresses everything written and decompresses everything read.
    ///
    /// Writes produce one compressed frame that is terminated by
    /// [`finish`](Self::finish) or [`close`](Self::close) (or `shutdown` through
    /// `AsyncWriteExt`). Reads decode one frame and then report end of input
    /// until [`reopen_read`](Self::reopen_read) is called.
    ///
    /// The two directions are independent; use `tokio::io::split` to drive
    /// them from different tasks.
    #[derive(Debug)]
    pub struct CompressedStream<S> {
        #[pin]
        inner: S,
        writer: WriteComposer,
        reader: ReadComposer,
        stats: Arc<StreamStatistics>,
        config: CompressionConfig,
    }
}

impl<S> CompressedStream<S> {
    /// Wraps `inner` with the default compression level.
    pub fn new(inner: S) -> Result<Self> {
        Self::with_config(inner, CompressionConfig::default())
    }

    /// Wraps `inner` compressing at `level`.
    pub fn with_level(inner: S, level: i32) -> Result<Self> {
        Self::with_config(inner, CompressionConfig::with_level(level))
    }

    /// Wraps `inner` with explicit codec parameters. No I/O is performed.
    pub fn with_config(inner: S, config: CompressionConfig) -> Result<Self> {
        config.validate()?;
        let encoder = ZstdEncoder::from_config(&config)?;
        let decoder = ZstdDecoder::from_config(&config)?;
        Self::from_codecs(inner, Box::new(encoder), Box::new(decoder), config)
    }

    /// Wraps `inner` using caller-supplied engines.
    ///
    /// Fails with `StreamError::Configuration` if either engine reports a
    /// zero chunk size.
    pub fn from_codecs(
        inner: S,
        encoder: Box<dyn Encode>,
        decoder: Box<dyn Decode>,
        config: CompressionConfig,
    ) -> Result<Self> {
        debug!(
            engine = encoder.name(),
            level = config.level,
            flush_policy = ?config.flush_policy,
            "creating compressed stream"
        );
        Ok(Self {
            inner,
            writer: WriteComposer::new(EncodeSession::new(encoder)?, config.flush_policy),
            reader: ReadComposer::new(DecodeSession::new(decoder)?),
            stats: Arc::new(StreamStatistics::new()),
            config,
        })
    }

    /// The wrapped transport.
    pub fn next_layer(&self) -> &S {
        &self.inner
    }

    /// Mutable access to the wrapped transport.
    ///
    /// Reading or writing through it directly corrupts the compressed stream.
    pub fn next_layer_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn next_layer_pin_mut(self: Pin<&mut Self>) -> Pin<&mut S> {
        self.project().inner
    }

    /// Unwraps the transport, discarding any buffered data.
    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Shared handle to the byte counters, usable from other threads.
    pub fn statistics(&self) -> Arc<StreamStatistics> {
        Arc::clone(&self.stats)
    }

    pub fn statistics_snapshot(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub fn write_state(&self) -> WriteState {
        self.writer.state()
    }

    pub fn close_state(&self) -> CloseState {
        self.writer.close_state()
    }

    pub fn read_state(&self) -> ReadState {
        self.reader.state()
    }

    /// Resets both codecs, all buffered data, both state machines and the
    /// counters.
    ///
    /// Any data buffered in either direction is lost, so the peer must
    /// resynchronize at a frame boundary.
    pub fn reset(&mut self) -> Result<()> {
        self.writer.reset()?;
        self.reader.reset()?;
        let previous = self.stats.reset();
        debug!(?previous, "compressed stream reset");
        Ok(())
    }

    /// Continues reading with the next frame after a frame boundary.
    pub fn reopen_read(&mut self) -> Result<()> {
        self.reader.reopen()
    }
}

impl<S: Transport> CompressedStream<S> {
    /// Reads decompressed bytes into `buf`.
    pub fn poll_read_decompressed(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize>> {
        let this = self.project();
        this.reader.poll_read(this.inner, cx, buf, this.stats)
    }

    /// Compresses `buf` onto the transport.
    pub fn poll_write_compressed(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize>> {
        let this = self.project();
        this.writer.poll_write(this.inner, cx, buf, this.stats)
    }

    /// Flushes compressor and transport.
    pub fn poll_flush_compressed(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.project();
        this.writer.poll_flush(this.inner, cx, this.stats)
    }

    /// Writes the frame trailer, leaving the transport open.
    pub fn poll_finish(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.project();
        this.writer.poll_finish(this.inner, cx, this.stats)
    }

    /// Writes the frame trailer and shuts the transport down.
    pub fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.project();
        this.writer.poll_close(this.inner, cx, this.stats)
    }
}

impl<S: Transport + Unpin> CompressedStream<S> {
    /// Ends the compressed frame without closing the transport.
    pub async fn finish(&mut self) -> Result<()> {
        poll_fn(|cx| Pin::new(&mut *self).poll_finish(cx)).await
    }

    /// Ends the compressed frame and shuts the transport down.
    pub async fn close(&mut self) -> Result<()> {
        poll_fn(|cx| Pin::new(&mut *self).poll_close(cx)).await
    }
}

impl<S: Transport> AsyncRead for CompressedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let unfilled = buf.initialize_unfilled();
        match self.poll_read_decompressed(cx, unfilled) {
            Poll::Ready(Ok(n)) => {
                buf.advance(n);
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e.into_io())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S: Transport> AsyncWrite for CompressedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_write_compressed(cx, buf).map_err(|e| e.into_io())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_flush_compressed(cx).map_err(|e| e.into_io())
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        CompressedStream::poll_close(self, cx).map_err(|e| e.into_io())
    }
}

#[cfg(feature = "futures-io")]
impl<S: Transport> futures::io::AsyncRead for CompressedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_read_decompressed(cx, buf).map_err(|e| e.into_io())
    }
}

#[cfg(feature = "futures-io")]
impl<S: Transport> futures::io::AsyncWrite for CompressedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_write_compressed(cx, buf).map_err(|e| e.into_io())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_flush_compressed(cx).map_err(|e| e.into_io())
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        CompressedStream::poll_close(self, cx).map_err(|e| e.into_io())
    }
}

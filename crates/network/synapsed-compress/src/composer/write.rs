//! Write path: plaintext in, compressed bytes out to the transport.

use crate::codec::{Direction, Status};
use crate::config::FlushPolicy;
use crate::error::{CodecError, CodecErrorKind, Misuse, Result, StreamError};
use crate::session::EncodeSession;
use crate::statistics::StreamStatistics;
use crate::transport::Transport;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

/// Where a write operation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Idle,
    Compressing,
    FlushingToTransport,
    /// A write, flush or close failed; only `reset()` recovers
    Failed,
}

/// Progress of the close path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    Open,
    /// Writing the frame trailer
    Finishing,
    /// Trailer written, transport still open
    Finished,
    ShuttingDown,
    Closed,
}

fn stalled(step: &str) -> StreamError {
    StreamError::Codec(CodecError::new(
        CodecErrorKind::ResourceLimitExceeded,
        Direction::Compress,
        format!("encoder made no progress during {} with an empty staging buffer", step),
    ))
}

/// Drives an `EncodeSession` against a transport.
#[derive(Debug)]
pub struct WriteComposer {
    session: EncodeSession,
    state: WriteState,
    close: CloseState,
    flush_policy: FlushPolicy,
    // codec flush requested but not yet fully emitted into staging
    codec_flush_pending: bool,
    // poll_flush started and has not completed
    flush_in_progress: bool,
    // error from the trailer, reported once the transport is shut down
    deferred: Option<StreamError>,
}

impl WriteComposer {
    pub fn new(session: EncodeSession, flush_policy: FlushPolicy) -> Self {
        Self {
            session,
            state: WriteState::Idle,
            close: CloseState::Open,
            flush_policy,
            codec_flush_pending: false,
            flush_in_progress: false,
            deferred: None,
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn close_state(&self) -> CloseState {
        self.close
    }

    /// Compressed bytes produced but not yet accepted by the transport.
    pub fn buffered(&self) -> usize {
        self.session.output().len()
    }

    fn fail<T>(&mut self, err: StreamError) -> Poll<Result<T>> {
        warn!(
            direction = %Direction::Compress,
            error_type = err.observable_type(),
            error = %err,
            "write path failed"
        );
        self.state = WriteState::Failed;
        Poll::Ready(Err(err))
    }

    fn check_usable(&self) -> Result<()> {
        if self.state == WriteState::Failed {
            return Err(StreamError::ProtocolMisuse(Misuse::Poisoned(Direction::Compress)));
        }
        Ok(())
    }

    /// Writes staged output to the transport until it is empty.
    fn poll_drain<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        stats: &StreamStatistics,
    ) -> Poll<Result<()>>
    where
        S: Transport + ?Sized,
    {
        while self.session.has_output() {
            self.state = WriteState::FlushingToTransport;
            match transport.as_mut().poll_write_some(cx, self.session.output()) {
                Poll::Ready(Ok(0)) => {
                    let err = io::Error::new(
                        io::ErrorKind::WriteZero,
                        "transport accepted no compressed bytes",
                    );
                    return self.fail(StreamError::Transport(err));
                }
                Poll::Ready(Ok(n)) => {
                    self.session.consume_output(n);
                    stats.record_tx_compressed(n);
                    trace!(written = n, remaining = self.session.output().len(), "drained to transport");
                }
                Poll::Ready(Err(e)) => return self.fail(StreamError::Transport(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }

    /// Runs pending codec flush steps, draining between them.
    fn poll_codec_flush<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        stats: &StreamStatistics,
    ) -> Poll<Result<()>>
    where
        S: Transport + ?Sized,
    {
        loop {
            match self.poll_drain(transport.as_mut(), cx, stats) {
                Poll::Ready(Ok(())) => {}
                other => return other,
            }
            if !self.codec_flush_pending {
                return Poll::Ready(Ok(()));
            }
            self.state = WriteState::Compressing;
            match self.session.flush() {
                Ok(progress) if progress.status == Status::Continue && progress.produced == 0 => {
                    return self.fail(stalled("flush"));
                }
                Ok(progress) => {
                    if progress.status != Status::Continue {
                        self.codec_flush_pending = false;
                    }
                }
                Err(e) => return self.fail(e),
            }
        }
    }

    /// Compresses `buf` and writes the result to the transport.
    ///
    /// Completes with the number of plaintext bytes the compressor consumed.
    /// If the transport stalls after some input was consumed, the write
    /// completes early with that count; the staged output goes out first on
    /// the next write, flush or close.
    pub fn poll_write<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        buf: &[u8],
        stats: &StreamStatistics,
    ) -> Poll<Result<usize>>
    where
        S: Transport + ?Sized,
    {
        self.check_usable()?;
        if self.close != CloseState::Open || self.session.is_finished() {
            return Poll::Ready(Err(StreamError::ProtocolMisuse(Misuse::WriteAfterClose)));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let mut consumed = 0;
        let mut idle_steps = 0;
        loop {
            match self.poll_codec_flush(transport.as_mut(), cx, stats) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending if consumed > 0 => {
                    self.state = WriteState::Idle;
                    trace!(consumed, staged = self.buffered(), "partial write, transport busy");
                    return Poll::Ready(Ok(consumed));
                }
                Poll::Pending => return Poll::Pending,
            }

            if consumed == buf.len() {
                self.state = WriteState::Idle;
                return Poll::Ready(Ok(consumed));
            }

            self.state = WriteState::Compressing;
            let progress = match self.session.compress(&buf[consumed..]) {
                Ok(progress) => progress,
                Err(e) => return self.fail(e),
            };
            consumed += progress.consumed;
            stats.record_tx_total(progress.consumed);
            if progress.consumed > 0 {
                self.flush_in_progress = false;
            }
            // one empty step is allowed while the engine drains held output
            if progress.consumed == 0 && progress.produced == 0 {
                idle_steps += 1;
                if idle_steps > 1 {
                    return self.fail(stalled("compress"));
                }
            } else {
                idle_steps = 0;
            }

            if consumed == buf.len() && self.flush_policy == FlushPolicy::EveryWrite {
                self.codec_flush_pending = true;
            }
        }
    }

    /// Emits all data written so far as decodable output and flushes the transport.
    pub fn poll_flush<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        stats: &StreamStatistics,
    ) -> Poll<Result<()>>
    where
        S: Transport + ?Sized,
    {
        self.check_usable()?;
        if !self.flush_in_progress {
            self.flush_in_progress = true;
            if !self.session.is_finished() {
                self.codec_flush_pending = true;
            }
        }

        match self.poll_codec_flush(transport.as_mut(), cx, stats) {
            Poll::Ready(Ok(())) => {}
            other => return other,
        }

        match transport.as_mut().poll_flush(cx) {
            Poll::Ready(Ok(())) => {
                self.flush_in_progress = false;
                self.state = WriteState::Idle;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => self.fail(StreamError::Transport(e)),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Writes the frame trailer and flushes the transport, leaving it open.
    pub fn poll_finish<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        stats: &StreamStatistics,
    ) -> Poll<Result<()>>
    where
        S: Transport + ?Sized,
    {
        match self.close {
            CloseState::Finished | CloseState::ShuttingDown | CloseState::Closed => {
                return Poll::Ready(Ok(()));
            }
            CloseState::Open => {
                self.check_usable()?;
                debug!("finishing compressed frame");
                self.close = CloseState::Finishing;
            }
            CloseState::Finishing => self.check_usable()?,
        }

        loop {
            match self.poll_drain(transport.as_mut(), cx, stats) {
                Poll::Ready(Ok(())) => {}
                other => return other,
            }
            if self.session.is_finished() {
                break;
            }
            self.state = WriteState::Compressing;
            match self.session.finish() {
                Ok(progress) if progress.status != Status::Done && progress.produced == 0 => {
                    return self.fail(stalled("finish"));
                }
                Ok(_) => {}
                Err(e) => return self.fail(e),
            }
        }

        match transport.as_mut().poll_flush(cx) {
            Poll::Ready(Ok(())) => {
                self.close = CloseState::Finished;
                self.state = WriteState::Idle;
                self.codec_flush_pending = false;
                self.flush_in_progress = false;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(e)) => self.fail(StreamError::Transport(e)),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Finishes the frame, then shuts the transport down.
    ///
    /// A trailer failure does not prevent the shutdown attempt; it is
    /// reported after it. Closing an already closed writer is a no-op.
    pub fn poll_close<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        stats: &StreamStatistics,
    ) -> Poll<Result<()>>
    where
        S: Transport + ?Sized,
    {
        loop {
            match self.close {
                CloseState::Closed => return Poll::Ready(Ok(())),
                CloseState::Open | CloseState::Finishing => {
                    if self.state == WriteState::Failed {
                        self.deferred = Some(StreamError::ProtocolMisuse(Misuse::Poisoned(
                            Direction::Compress,
                        )));
                        self.close = CloseState::ShuttingDown;
                        continue;
                    }
                    match self.poll_finish(transport.as_mut(), cx, stats) {
                        Poll::Ready(Ok(())) => {}
                        Poll::Ready(Err(e)) => {
                            self.deferred = Some(e);
                            self.close = CloseState::ShuttingDown;
                        }
                        Poll::Pending => return Poll::Pending,
                    }
                }
                CloseState::Finished => {
                    debug!("shutting down transport");
                    self.close = CloseState::ShuttingDown;
                }
                CloseState::ShuttingDown => {
                    let result = match transport.as_mut().poll_close(cx) {
                        Poll::Ready(result) => result,
                        Poll::Pending => return Poll::Pending,
                    };
                    self.close = CloseState::Closed;
                    if let Some(err) = self.deferred.take() {
                        if let Err(e) = result {
                            debug!(error = %e, "transport shutdown also failed");
                        }
                        return Poll::Ready(Err(err));
                    }
                    return match result {
                        Ok(()) => {
                            debug!("compressed stream closed");
                            Poll::Ready(Ok(()))
                        }
                        Err(e) => self.fail(StreamError::Transport(e)),
                    };
                }
            }
        }
    }

    /// Returns to a fresh frame, dropping staged output and the close state.
    pub fn reset(&mut self) -> Result<()> {
        self.session.reset()?;
        self.state = WriteState::Idle;
        self.close = CloseState::Open;
        self.codec_flush_pending = false;
        self.flush_in_progress = false;
        self.deferred = None;
        Ok(())
    }
}

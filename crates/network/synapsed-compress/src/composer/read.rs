//! Read path: compressed bytes from the transport, plaintext out.

use crate::codec::{Direction, Status};
use crate::error::{CodecError, CodecErrorKind, Misuse, Result, StreamError};
use crate::session::DecodeSession;
use crate::statistics::StreamStatistics;
use crate::transport::Transport;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

/// Where the read side currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Idle,
    ReadingTransport,
    Decompressing,
    /// The current frame ended; reads return 0 until `reopen`
    EndOfFrame,
    /// The transport ended cleanly between frames
    EndOfStream,
    Failed,
}

/// Drives a `DecodeSession` against a transport.
#[derive(Debug)]
pub struct ReadComposer {
    session: DecodeSession,
    state: ReadState,
}

impl ReadComposer {
    pub fn new(session: DecodeSession) -> Self {
        Self {
            session,
            state: ReadState::Idle,
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Received bytes the decompressor has not consumed yet.
    pub fn buffered(&self) -> usize {
        self.session.buffered_len()
    }

    fn fail<T>(&mut self, err: StreamError) -> Poll<Result<T>> {
        warn!(
            direction = %Direction::Decompress,
            error_type = err.observable_type(),
            error = %err,
            "read path failed"
        );
        self.state = ReadState::Failed;
        Poll::Ready(Err(err))
    }

    /// Fills `out` with decompressed bytes.
    ///
    /// Completes with `Ok(0)` at a frame boundary or at a clean end of the
    /// transport. Returns as soon as any plaintext is available rather than
    /// waiting for `out` to fill.
    pub fn poll_read<S>(
        &mut self,
        mut transport: Pin<&mut S>,
        cx: &mut Context<'_>,
        out: &mut [u8],
        stats: &StreamStatistics,
    ) -> Poll<Result<usize>>
    where
        S: Transport + ?Sized,
    {
        match self.state {
            ReadState::Failed => {
                return Poll::Ready(Err(StreamError::ProtocolMisuse(Misuse::Poisoned(
                    Direction::Decompress,
                ))));
            }
            ReadState::EndOfFrame | ReadState::EndOfStream => return Poll::Ready(Ok(0)),
            _ => {}
        }
        if out.is_empty() {
            return Poll::Ready(Ok(0));
        }

        loop {
            if self.session.has_buffered_input() {
                self.state = ReadState::Decompressing;
                let progress = match self.session.decompress(out) {
                    Ok(progress) => progress,
                    Err(e) => return self.fail(e),
                };
                stats.record_rx_total(progress.produced);

                match progress.status {
                    Status::FrameComplete | Status::Done => {
                        self.state = ReadState::EndOfFrame;
                        let trailing = self.session.buffered_len();
                        if trailing > 0 {
                            warn!(trailing, "bytes follow the end of the compressed frame");
                        }
                        return Poll::Ready(Ok(progress.produced));
                    }
                    Status::Continue => {
                        self.state = ReadState::Idle;
                        return Poll::Ready(Ok(progress.produced));
                    }
                    Status::NeedsInput if progress.produced > 0 => {
                        self.state = ReadState::Idle;
                        return Poll::Ready(Ok(progress.produced));
                    }
                    Status::NeedsInput => {}
                }
            }

            self.state = ReadState::ReadingTransport;
            let space = self.session.input_space();
            if space.is_empty() {
                // the last decode step saw a full staging buffer and neither consumed nor produced
                let capacity = self.session.buffered_len();
                return self.fail(StreamError::Codec(CodecError::new(
                    CodecErrorKind::ResourceLimitExceeded,
                    Direction::Decompress,
                    format!("decoder made no progress on a full {} byte staging buffer", capacity),
                )));
            }
            match transport.as_mut().poll_read_some(cx, space) {
                Poll::Ready(Ok(0)) => {
                    if self.session.is_mid_frame() {
                        debug!(buffered = self.session.buffered_len(), "transport ended inside a frame");
                        return self.fail(StreamError::TruncatedStream);
                    }
                    debug!("transport ended between frames");
                    self.state = ReadState::EndOfStream;
                    return Poll::Ready(Ok(0));
                }
                Poll::Ready(Ok(n)) => {
                    self.session.commit_input(n);
                    stats.record_rx_compressed(n);
                    trace!(received = n, "read from transport");
                }
                Poll::Ready(Err(e)) => return self.fail(StreamError::Transport(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    /// Continues with the next concatenated frame after `EndOfFrame`.
    ///
    /// Bytes already received after the previous frame are kept. In any
    /// other state this does nothing.
    pub fn reopen(&mut self) -> Result<()> {
        match self.state {
            ReadState::Failed => Err(StreamError::ProtocolMisuse(Misuse::Poisoned(
                Direction::Decompress,
            ))),
            ReadState::EndOfFrame => {
                self.session.reopen()?;
                self.state = ReadState::Idle;
                debug!(buffered = self.session.buffered_len(), "reopened for next frame");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Drops all buffered input and decoder state.
    pub fn reset(&mut self) -> Result<()> {
        self.session.reset()?;
        self.state = ReadState::Idle;
        Ok(())
    }
}

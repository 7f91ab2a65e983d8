//! Codec sessions: one engine plus its staging buffer.
//!
//! The compress side stages engine output until the transport accepts it.
//! The decompress side stages transport input until the engine consumes it.

use crate::codec::{Decode, Direction, Encode, Progress, Status};
use crate::error::{Misuse, Result, StreamError};

fn staging_for(engine: &str, direction: Direction, capacity: usize) -> Result<StagingBuffer> {
    if capacity == 0 {
        return Err(StreamError::Configuration(format!(
            "{} engine '{}' reports a zero chunk size",
            direction, engine
        )));
    }
    Ok(StagingBuffer::new(capacity))
}
use tracing::{debug, trace};

/// Fixed-capacity byte buffer holding a valid range `[start, end)`.
#[derive(Debug)]
pub struct StagingBuffer {
    buf: Box<[u8]>,
    start: usize,
    end: usize,
}

impl StagingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Valid bytes not yet consumed.
    pub fn filled(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Free space after the valid range.
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.end..]
    }

    /// Marks `n` bytes of the free space as valid.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.end + n <= self.buf.len());
        self.end = (self.end + n).min(self.buf.len());
    }

    /// Drops `n` bytes from the front of the valid range.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.len());
        self.start = (self.start + n).min(self.end);
        if self.start == self.end {
            self.start = 0;
            self.end = 0;
        }
    }

    /// Moves the valid range to the front so the free space is contiguous.
    pub fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.buf.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}

/// Compressor plus the staging buffer its output goes to.
#[derive(Debug)]
pub struct EncodeSession {
    engine: Box<dyn Encode>,
    staging: StagingBuffer,
    // last step filled the output; the engine still holds produced data
    pending: bool,
    finished: bool,
}

impl EncodeSession {
    /// Fails with `Configuration` if the engine asks for no staging space.
    pub fn new(engine: Box<dyn Encode>) -> Result<Self> {
        let staging = staging_for(engine.name(), Direction::Compress, engine.recommended_chunk_size())?;
        Ok(Self {
            engine,
            staging,
            pending: false,
            finished: false,
        })
    }

    /// Compresses from `input` into the free staging space.
    ///
    /// While earlier output is still pending inside the engine, the engine is
    /// driven with empty input and `consumed` is 0.
    pub fn compress(&mut self, input: &[u8]) -> Result<Progress> {
        if self.finished {
            return Err(StreamError::ProtocolMisuse(Misuse::WriteAfterClose));
        }

        let input = if self.pending { &[][..] } else { input };
        let progress = self.engine.advance(input, self.staging.unfilled_mut())?;
        self.staging.commit(progress.produced);
        self.pending = progress.status == Status::Continue && progress.consumed == input.len();

        trace!(
            direction = %Direction::Compress,
            consumed = progress.consumed,
            produced = progress.produced,
            status = ?progress.status,
            "compress step"
        );
        Ok(progress)
    }

    /// Asks the engine to emit everything buffered so far.
    ///
    /// Returns `Continue` while more flushed output remains.
    pub fn flush(&mut self) -> Result<Progress> {
        if self.finished {
            return Ok(Progress::new(0, 0, Status::Done));
        }

        let progress = self.engine.flush(self.staging.unfilled_mut())?;
        self.staging.commit(progress.produced);
        self.pending = false;
        Ok(progress)
    }

    /// Writes (part of) the frame epilogue. `Done` once it is complete.
    pub fn finish(&mut self) -> Result<Progress> {
        if self.finished {
            return Ok(Progress::new(0, 0, Status::Done));
        }

        let progress = self.engine.finish(self.staging.unfilled_mut())?;
        self.staging.commit(progress.produced);
        self.pending = false;
        if progress.status == Status::Done {
            self.finished = true;
            debug!(engine = self.engine.name(), "compressed frame finished");
        }
        Ok(progress)
    }

    /// Compressed bytes waiting for the transport.
    pub fn output(&self) -> &[u8] {
        self.staging.filled()
    }

    /// Marks `n` staged bytes as written.
    pub fn consume_output(&mut self, n: usize) {
        self.staging.consume(n);
    }

    pub fn has_output(&self) -> bool {
        !self.staging.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Starts a fresh frame, dropping staged output.
    pub fn reset(&mut self) -> Result<()> {
        self.engine.reset()?;
        self.staging.clear();
        self.pending = false;
        self.finished = false;
        Ok(())
    }
}

/// Decompressor plus the staging buffer its input comes from.
#[derive(Debug)]
pub struct DecodeSession {
    engine: Box<dyn Decode>,
    staging: StagingBuffer,
    pending: bool,
    in_frame: bool,
    frame_complete: bool,
}

impl DecodeSession {
    /// Fails with `Configuration` if the engine asks for no staging space.
    pub fn new(engine: Box<dyn Decode>) -> Result<Self> {
        let staging = staging_for(engine.name(), Direction::Decompress, engine.recommended_chunk_size())?;
        Ok(Self {
            engine,
            staging,
            pending: false,
            in_frame: false,
            frame_complete: false,
        })
    }

    /// Decompresses staged input into `output`.
    pub fn decompress(&mut self, output: &mut [u8]) -> Result<Progress> {
        let progress = self.engine.advance(self.staging.filled(), output)?;
        self.staging.consume(progress.consumed);
        if progress.consumed > 0 {
            self.in_frame = true;
        }

        match progress.status {
            Status::FrameComplete | Status::Done => {
                self.pending = false;
                self.in_frame = false;
                self.frame_complete = true;
                debug!(
                    engine = self.engine.name(),
                    trailing = self.staging.len(),
                    "compressed frame complete"
                );
            }
            Status::Continue => self.pending = true,
            Status::NeedsInput => self.pending = false,
        }

        trace!(
            direction = %Direction::Decompress,
            consumed = progress.consumed,
            produced = progress.produced,
            status = ?progress.status,
            "decompress step"
        );
        Ok(progress)
    }

    /// Free staging space for the next transport read, compacting first.
    pub fn input_space(&mut self) -> &mut [u8] {
        self.staging.compact();
        self.staging.unfilled_mut()
    }

    /// Marks `n` bytes of `input_space` as received.
    pub fn commit_input(&mut self, n: usize) {
        self.staging.commit(n);
    }

    /// Undecoded input is staged or the engine holds undelivered output.
    pub fn has_buffered_input(&self) -> bool {
        !self.staging.is_empty() || self.pending
    }

    /// Bytes received but not yet handed to the engine.
    pub fn buffered_len(&self) -> usize {
        self.staging.len()
    }

    /// End of input now would cut a frame short.
    pub fn is_mid_frame(&self) -> bool {
        self.in_frame || !self.staging.is_empty()
    }

    pub fn is_frame_complete(&self) -> bool {
        self.frame_complete
    }

    /// Prepares the engine for the next frame, keeping staged input.
    pub fn reopen(&mut self) -> Result<()> {
        self.engine.reset()?;
        self.pending = false;
        self.in_frame = false;
        self.frame_complete = false;
        Ok(())
    }

    /// Drops all state, including staged input.
    pub fn reset(&mut self) -> Result<()> {
        self.reopen()?;
        self.staging.clear();
        Ok(())
    }
}

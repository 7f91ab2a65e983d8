//! Engine-level tests through the public codec traits.

use crate::test_utils::{generate_pattern_data, init_test_logging, DataPattern, MemoryTransport};
use synapsed_compress::{
    CodecError, CompressedStream, CompressionConfig, Decode, Encode, Progress, Status, StreamError,
    ZstdDecoder, ZstdEncoder,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Pass-through engine with a one-byte end marker, used to exercise the
/// engine seam independently of zstd.
#[derive(Debug, Default)]
struct MarkerCodec {
    finished: bool,
}

const END_MARKER: u8 = 0xFF;

impl Encode for MarkerCodec {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let n = input.len().min(output.len());
        output[..n].copy_from_slice(&input[..n]);
        let status = if n < input.len() { Status::Continue } else { Status::NeedsInput };
        Ok(Progress::new(n, n, status))
    }

    fn flush(&mut self, _output: &mut [u8]) -> Result<Progress, CodecError> {
        Ok(Progress::new(0, 0, Status::NeedsInput))
    }

    fn finish(&mut self, output: &mut [u8]) -> Result<Progress, CodecError> {
        if self.finished {
            return Ok(Progress::new(0, 0, Status::Done));
        }
        output[0] = END_MARKER;
        self.finished = true;
        Ok(Progress::new(0, 1, Status::Done))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        self.finished = false;
        Ok(())
    }

    fn recommended_chunk_size(&self) -> usize {
        16
    }

    fn name(&self) -> &'static str {
        "marker"
    }
}

impl Decode for MarkerCodec {
    fn advance(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        let mut n = 0;
        while n < input.len() && n < output.len() {
            if input[n] == END_MARKER {
                return Ok(Progress::new(n + 1, n, Status::FrameComplete));
            }
            output[n] = input[n];
            n += 1;
        }
        let status = if n < input.len() { Status::Continue } else { Status::NeedsInput };
        Ok(Progress::new(n, n, status))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn recommended_chunk_size(&self) -> usize {
        16
    }

    fn name(&self) -> &'static str {
        "marker"
    }
}

#[tokio::test]
async fn test_custom_engine_through_stream() {
    init_test_logging();

    let mut writer = CompressedStream::from_codecs(
        MemoryTransport::new(),
        Box::new(MarkerCodec::default()),
        Box::new(MarkerCodec::default()),
        CompressionConfig::default(),
    )
    .unwrap();
    writer.write_all(b"plain bytes passing through").await.unwrap();
    writer.close().await.unwrap();

    let wire = writer.into_inner().outgoing;
    assert_eq!(wire.last(), Some(&END_MARKER));

    let mut reader = CompressedStream::from_codecs(
        MemoryTransport::with_incoming(wire),
        Box::new(MarkerCodec::default()),
        Box::new(MarkerCodec::default()),
        CompressionConfig::default(),
    )
    .unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    assert_eq!(out, b"plain bytes passing through");
}

/// Engine that asks for no staging space at all.
#[derive(Debug)]
struct ZeroChunk;

impl Encode for ZeroChunk {
    fn advance(&mut self, _input: &[u8], _output: &mut [u8]) -> Result<Progress, CodecError> {
        Ok(Progress::new(0, 0, Status::Continue))
    }

    fn flush(&mut self, _output: &mut [u8]) -> Result<Progress, CodecError> {
        Ok(Progress::new(0, 0, Status::NeedsInput))
    }

    fn finish(&mut self, _output: &mut [u8]) -> Result<Progress, CodecError> {
        Ok(Progress::new(0, 0, Status::Done))
    }

    fn reset(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn recommended_chunk_size(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "zero-chunk"
    }
}

#[test]
fn test_zero_chunk_engine_rejected() {
    let err = CompressedStream::from_codecs(
        MemoryTransport::new(),
        Box::new(ZeroChunk),
        Box::new(ZstdDecoder::new().unwrap()),
        CompressionConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StreamError::Configuration(ref msg) if msg.contains("zero-chunk")));
}

#[test]
fn test_encoder_output_is_standard_zstd() {
    let data = generate_pattern_data(DataPattern::Text, 10_000);
    let mut encoder = ZstdEncoder::new(5).unwrap();
    let mut chunk = vec![0u8; encoder.recommended_chunk_size()];
    let mut wire = Vec::new();

    let mut input = &data[..];
    while !input.is_empty() {
        let p = encoder.advance(input, &mut chunk).unwrap();
        wire.extend_from_slice(&chunk[..p.produced]);
        input = &input[p.consumed..];
    }
    loop {
        let p = encoder.finish(&mut chunk).unwrap();
        wire.extend_from_slice(&chunk[..p.produced]);
        if p.status == Status::Done {
            break;
        }
    }

    assert!(wire.len() < data.len());
    assert_eq!(zstd::stream::decode_all(&wire[..]).unwrap(), data);
}

#[test]
fn test_decoder_reads_standard_zstd() {
    let data = generate_pattern_data(DataPattern::Sequential, 4096);
    let wire = zstd::stream::encode_all(&data[..], 1).unwrap();

    let mut decoder = ZstdDecoder::new().unwrap();
    let mut out = vec![0u8; 8192];
    let p = decoder.advance(&wire, &mut out).unwrap();
    assert_eq!(p.status, Status::FrameComplete);
    assert_eq!(&out[..p.produced], &data[..]);
}

#[test]
fn test_decoder_reset_accepts_new_frame() {
    let mut decoder = ZstdDecoder::new().unwrap();
    let mut out = [0u8; 64];

    // half a frame, then abandon it
    let first = zstd::stream::encode_all(&b"abandoned"[..], 1).unwrap();
    decoder.advance(&first[..first.len() / 2], &mut out).unwrap();
    decoder.reset().unwrap();

    let second = zstd::stream::encode_all(&b"fresh"[..], 1).unwrap();
    let p = decoder.advance(&second, &mut out).unwrap();
    assert_eq!(&out[..p.produced], b"fresh");
}

#[test]
fn test_recommended_sizes() {
    let encoder = ZstdEncoder::new(3).unwrap();
    let decoder = ZstdDecoder::new().unwrap();
    assert!(encoder.recommended_chunk_size() >= 1 << 16);
    assert!(decoder.recommended_chunk_size() >= 1 << 16);
    assert_eq!(encoder.name(), "zstd");
    assert_eq!(encoder.level(), 3);
}

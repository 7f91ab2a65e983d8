//! Transport failures and how they surface through the stream.

use crate::test_utils::{init_test_logging, FailingTransport};
use std::io;
use synapsed_compress::{
    CloseState, CompressedStream, CompressionConfig, FlushPolicy, Misuse, ReadState, StreamError,
    WriteState,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn test_write_error_passes_through_unchanged() {
    init_test_logging();

    let config = CompressionConfig {
        flush_policy: FlushPolicy::EveryWrite,
        ..Default::default()
    };
    let mut stream =
        CompressedStream::with_config(FailingTransport::new(io::ErrorKind::ConnectionReset), config)
            .unwrap();

    let err = stream.write_all(b"payload").await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    assert!(StreamError::from_io(&err).is_none());
    assert_eq!(stream.write_state(), WriteState::Failed);
}

#[tokio::test]
async fn test_buffered_write_fails_on_flush_then_poisons() {
    let mut stream = CompressedStream::new(FailingTransport::new(io::ErrorKind::BrokenPipe)).unwrap();

    // small writes stay inside the compressor
    stream.write_all(b"buffered").await.unwrap();

    let err = stream.flush().await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

    let err = stream.write_all(b"more").await.unwrap_err();
    assert!(matches!(
        StreamError::from_io(&err),
        Some(StreamError::ProtocolMisuse(Misuse::Poisoned(_)))
    ));
}

#[tokio::test]
async fn test_read_error_passes_through() {
    let mut stream = CompressedStream::new(FailingTransport::new(io::ErrorKind::ConnectionAborted)).unwrap();
    let mut buf = [0u8; 32];
    let err = stream.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    assert_eq!(stream.read_state(), ReadState::Failed);
}

#[tokio::test]
async fn test_read_failure_leaves_writes_usable() {
    let mut transport = FailingTransport::new(io::ErrorKind::ConnectionAborted);
    transport.fail_writes = false;
    let mut stream = CompressedStream::new(transport).unwrap();

    let mut buf = [0u8; 32];
    assert!(stream.read(&mut buf).await.is_err());

    stream.write_all(b"half-closed peers may keep writing").await.unwrap();
    stream.close().await.unwrap();
    assert_eq!(stream.close_state(), CloseState::Closed);
}

#[tokio::test]
async fn test_close_attempts_shutdown_after_trailer_failure() {
    let mut stream = CompressedStream::new(FailingTransport::new(io::ErrorKind::BrokenPipe)).unwrap();
    stream.write_all(b"never delivered").await.unwrap();

    let err = stream.close().await.unwrap_err();
    assert!(matches!(err, StreamError::Transport(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    assert!(stream.next_layer().shutdown_attempted);
    assert_eq!(stream.close_state(), CloseState::Closed);

    // the failure is reported once; closing again is a no-op
    stream.close().await.unwrap();
}

#[tokio::test]
async fn test_clean_eof_from_transport() {
    let mut transport = FailingTransport::new(io::ErrorKind::Other);
    transport.fail_reads = false;
    let mut stream = CompressedStream::new(transport).unwrap();

    let mut buf = [0u8; 8];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    assert_eq!(stream.read_state(), ReadState::EndOfStream);
}

//! Error classification as seen through the I/O traits.

use std::io;
use synapsed_compress::{CodecErrorKind, Direction, ErrorSeverity, Misuse, StreamError};

#[test]
fn test_observable_types_are_distinct() {
    let errors = vec![
        StreamError::Transport(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        StreamError::TruncatedStream,
        StreamError::ProtocolMisuse(Misuse::WriteAfterClose),
        StreamError::Configuration("bad".into()),
    ];
    let mut labels: Vec<_> = errors.iter().map(|e| e.observable_type()).collect();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), errors.len());
}

#[test]
fn test_misuse_kinds() {
    let io_err = StreamError::ProtocolMisuse(Misuse::Poisoned(Direction::Decompress)).into_io();
    assert_eq!(io_err.kind(), io::ErrorKind::Other);
    match StreamError::from_io(&io_err) {
        Some(StreamError::ProtocolMisuse(Misuse::Poisoned(direction))) => {
            assert_eq!(*direction, Direction::Decompress)
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_configuration_maps_to_invalid_input() {
    let io_err: io::Error = StreamError::Configuration("level".into()).into();
    assert_eq!(io_err.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(
        StreamError::from_io(&io_err).map(|e| e.severity()),
        Some(ErrorSeverity::Major)
    );
}

#[test]
fn test_codec_kind_only_for_codec_errors() {
    assert_eq!(StreamError::TruncatedStream.codec_kind(), None);
    assert_ne!(CodecErrorKind::Corrupt, CodecErrorKind::UnsupportedFormat);
}

#[test]
fn test_plain_io_error_has_no_stream_error() {
    let io_err = io::Error::new(io::ErrorKind::TimedOut, "slow peer");
    assert!(StreamError::from_io(&io_err).is_none());
}

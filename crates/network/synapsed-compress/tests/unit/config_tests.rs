//! Configuration loading and validation.

use synapsed_compress::{CompressedStream, CompressionConfig, FlushPolicy, StreamError};
use tokio::io::AsyncWriteExt;

use crate::test_utils::{decompress_frame, MemoryTransport};

#[test]
fn test_toml_file_configures_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.toml");
    std::fs::write(
        &path,
        r#"
level = 19
window_log = 20
max_window_log = 20
checksum = true
flush_policy = "every_write"
"#,
    )
    .unwrap();

    let config = CompressionConfig::from_file(&path).unwrap();
    assert_eq!(config.level, 19);
    assert_eq!(config.window_log, Some(20));
    assert_eq!(config.flush_policy, FlushPolicy::EveryWrite);

    let stream = CompressedStream::with_config(MemoryTransport::new(), config.clone()).unwrap();
    assert_eq!(stream.config(), &config);
}

#[test]
fn test_missing_file_is_configuration_error() {
    let err = CompressionConfig::from_file("/nonexistent/synapsed/compress.toml").unwrap_err();
    assert!(matches!(err, StreamError::Configuration(_)));
}

#[test]
fn test_malformed_toml_rejected() {
    let err = CompressionConfig::from_toml_str("level = \"high\"").unwrap_err();
    assert!(matches!(err, StreamError::Configuration(_)));
}

#[test]
fn test_out_of_range_window_rejected_at_construction() {
    let config = CompressionConfig {
        max_window_log: Some(40),
        ..Default::default()
    };
    let err = CompressedStream::with_config(MemoryTransport::new(), config).unwrap_err();
    assert_eq!(err.observable_type(), "configuration");
}

#[tokio::test]
async fn test_checksum_frame_decodes() {
    let config = CompressionConfig {
        checksum: true,
        ..Default::default()
    };
    let mut stream = CompressedStream::with_config(MemoryTransport::new(), config).unwrap();
    stream.write_all(b"checksummed payload").await.unwrap();
    stream.close().await.unwrap();

    let wire = stream.into_inner().outgoing;
    assert_eq!(decompress_frame(wire).await, b"checksummed payload");
}

#[tokio::test]
async fn test_every_level_round_trips() {
    let data = b"level sweep level sweep level sweep".to_vec();
    for level in [1, 3, 9, 19] {
        let mut stream = CompressedStream::with_level(MemoryTransport::new(), level).unwrap();
        stream.write_all(&data).await.unwrap();
        stream.close().await.unwrap();

        let wire = stream.into_inner().outgoing;
        assert_eq!(decompress_frame(wire).await, data, "level {}", level);
    }
}

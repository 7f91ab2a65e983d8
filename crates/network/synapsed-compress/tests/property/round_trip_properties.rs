//! Property-based tests for fragmentation and backpressure.

use crate::test_utils::{compress_in_slices, MemoryTransport, ThrottledTransport};
use proptest::prelude::*;
use synapsed_compress::{CompressedStream, CompressionConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

prop_compose! {
    fn arb_payload()(
        data in prop_oneof![
            prop::collection::vec(any::<u8>(), 0..4096),
            // compressible runs
            prop::collection::vec(0u8..4, 0..65536),
        ]
    ) -> Vec<u8> {
        data
    }
}

/// Writes `data` in `write_slice` pieces and reads it back with a
/// `read_buf` sized buffer, with both sides behind a throttled transport.
async fn fragmented_round_trip(
    data: &[u8],
    write_slice: usize,
    transport_chunk: usize,
    read_buf: usize,
) -> Vec<u8> {
    let transport = ThrottledTransport::new(MemoryTransport::new(), transport_chunk);
    let mut writer = CompressedStream::new(transport).unwrap();
    for piece in data.chunks(write_slice) {
        writer.write_all(piece).await.unwrap();
    }
    writer.close().await.unwrap();
    let wire = writer.into_inner().into_inner().outgoing;

    let transport = ThrottledTransport::new(MemoryTransport::with_incoming(wire), transport_chunk);
    let mut reader = CompressedStream::new(transport).unwrap();
    let mut out = Vec::with_capacity(data.len());
    let mut buf = vec![0u8; read_buf];
    loop {
        let n = reader.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: data survives any fragmentation of writes, transport I/O and reads
    #[test]
    fn prop_round_trip_any_fragmentation(
        data in arb_payload(),
        write_slice in 1usize..2048,
        transport_chunk in 1usize..512,
        read_buf in 1usize..300_000,
    ) {
        let restored = tokio::runtime::Runtime::new().unwrap().block_on(
            fragmented_round_trip(&data, write_slice, transport_chunk, read_buf)
        );
        prop_assert_eq!(restored, data);
    }

    /// Property: slicing the input does not change the compressed bytes
    #[test]
    fn prop_slicing_does_not_change_output(
        data in arb_payload(),
        slice in 1usize..1024,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let whole = rt.block_on(compress_in_slices(&data, data.len().max(1), CompressionConfig::default()));
        let sliced = rt.block_on(compress_in_slices(&data, slice, CompressionConfig::default()));
        prop_assert_eq!(sliced, whole);
    }

    /// Property: tiny read buffers never duplicate or drop bytes
    #[test]
    fn prop_small_reads_reproduce_plaintext(
        data in prop::collection::vec(any::<u8>(), 1..8192),
        read_buf in 1usize..8,
    ) {
        let restored = tokio::runtime::Runtime::new().unwrap().block_on(
            fragmented_round_trip(&data, data.len(), 4096, read_buf)
        );
        prop_assert_eq!(restored, data);
    }
}

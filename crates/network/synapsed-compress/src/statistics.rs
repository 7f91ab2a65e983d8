//! Byte counters for a compressed stream.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between a stream and its observers.
///
/// Counters are updated by the stream and may be read or reset from any
/// thread while I/O is in progress.
#[derive(Debug, Default)]
pub struct StreamStatistics {
    tx_bytes_total: AtomicU64,
    tx_bytes_compressed: AtomicU64,
    rx_bytes_total: AtomicU64,
    rx_bytes_compressed: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Plaintext bytes accepted by writes
    pub tx_bytes_total: u64,
    /// Compressed bytes written to the transport
    pub tx_bytes_compressed: u64,
    /// Plaintext bytes delivered by reads
    pub rx_bytes_total: u64,
    /// Compressed bytes read from the transport
    pub rx_bytes_compressed: u64,
}

impl StatisticsSnapshot {
    /// Compressed-to-plaintext ratio for the write side, `None` before any write.
    pub fn tx_compression_ratio(&self) -> Option<f64> {
        ratio(self.tx_bytes_compressed, self.tx_bytes_total)
    }

    /// Compressed-to-plaintext ratio for the read side, `None` before any read.
    pub fn rx_compression_ratio(&self) -> Option<f64> {
        ratio(self.rx_bytes_compressed, self.rx_bytes_total)
    }

    /// Ratio over both directions combined.
    pub fn compression_ratio(&self) -> Option<f64> {
        ratio(
            self.tx_bytes_compressed + self.rx_bytes_compressed,
            self.tx_bytes_total + self.rx_bytes_total,
        )
    }
}

fn ratio(compressed: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(compressed as f64 / total as f64)
    }
}

impl StreamStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_tx_total(&self, bytes: usize) {
        self.tx_bytes_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_tx_compressed(&self, bytes: usize) {
        self.tx_bytes_compressed.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_total(&self, bytes: usize) {
        self.rx_bytes_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_compressed(&self, bytes: usize) {
        self.rx_bytes_compressed.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn tx_bytes_total(&self) -> u64 {
        self.tx_bytes_total.load(Ordering::Relaxed)
    }

    pub fn tx_bytes_compressed(&self) -> u64 {
        self.tx_bytes_compressed.load(Ordering::Relaxed)
    }

    pub fn rx_bytes_total(&self) -> u64 {
        self.rx_bytes_total.load(Ordering::Relaxed)
    }

    pub fn rx_bytes_compressed(&self) -> u64 {
        self.rx_bytes_compressed.load(Ordering::Relaxed)
    }

    /// Reads all four counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            tx_bytes_total: self.tx_bytes_total(),
            tx_bytes_compressed: self.tx_bytes_compressed(),
            rx_bytes_total: self.rx_bytes_total(),
            rx_bytes_compressed: self.rx_bytes_compressed(),
        }
    }

    /// Zeroes all counters, returning the values they held.
    ///
    /// Each counter is swapped individually, so no increment is lost.
    pub fn reset(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            tx_bytes_total: self.tx_bytes_total.swap(0, Ordering::Relaxed),
            tx_bytes_compressed: self.tx_bytes_compressed.swap(0, Ordering::Relaxed),
            rx_bytes_total: self.rx_bytes_total.swap(0, Ordering::Relaxed),
            rx_bytes_compressed: self.rx_bytes_compressed.swap(0, Ordering::Relaxed),
        }
    }
}

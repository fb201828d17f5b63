//! Observability and Metrics
//!
//! Counters for codec traffic and rejections.
//!
//! Uses atomic counters for thread-safe metrics collection; recording a
//! value never blocks an encode or decode.

use crate::error::WireError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Global metrics collector for codec operations
#[derive(Debug)]
pub struct Metrics {
    /// Messages successfully encoded
    pub messages_encoded: AtomicU64,
    /// Messages successfully decoded
    pub messages_decoded: AtomicU64,
    /// Total bytes written (header + payload)
    pub bytes_encoded: AtomicU64,
    /// Total bytes consumed by successful decodes
    pub bytes_decoded: AtomicU64,
    /// Frames refused with `InvalidMagic`
    pub rejected_magic: AtomicU64,
    /// Frames refused with `UnknownCommand` / `InvalidCommand`
    pub rejected_command: AtomicU64,
    /// Frames refused with `CommandNotSupported`
    pub rejected_version: AtomicU64,
    /// Frames refused with `PayloadTooLarge`
    pub rejected_oversize: AtomicU64,
    /// Frames refused with `ChecksumMismatch`
    pub rejected_checksum: AtomicU64,
    /// Payloads that failed structural decoding
    pub rejected_payload: AtomicU64,
    /// Encode failures of any kind
    pub encode_errors: AtomicU64,
    /// Receive or send operations that hit a deadline
    pub timeouts: AtomicU64,
    /// Operations abandoned through cancellation
    pub cancellations: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            messages_encoded: AtomicU64::new(0),
            messages_decoded: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            rejected_magic: AtomicU64::new(0),
            rejected_command: AtomicU64::new(0),
            rejected_version: AtomicU64::new(0),
            rejected_oversize: AtomicU64::new(0),
            rejected_checksum: AtomicU64::new(0),
            rejected_payload: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record an encoded frame
    pub fn message_encoded(&self, byte_count: usize) {
        self.messages_encoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    /// Record a decoded frame
    pub fn message_decoded(&self, byte_count: usize) {
        self.messages_decoded.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Bucket a decode-side error into its counter.
    pub fn decode_error(&self, err: &WireError) {
        let counter = match err.root() {
            WireError::InvalidMagic { .. } => &self.rejected_magic,
            WireError::UnknownCommand { .. } | WireError::InvalidCommand { .. } => {
                &self.rejected_command
            }
            WireError::CommandNotSupported { .. } => &self.rejected_version,
            WireError::PayloadTooLarge { .. } => &self.rejected_oversize,
            WireError::ChecksumMismatch { .. } => &self.rejected_checksum,
            WireError::Timeout(_) => &self.timeouts,
            WireError::Cancelled => &self.cancellations,
            WireError::ConnectionClosed | WireError::ConnectionRejected | WireError::Io(_) => {
                return
            }
            _ => &self.rejected_payload,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancelled(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_encoded: self.messages_encoded.load(Ordering::Relaxed),
            messages_decoded: self.messages_decoded.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            rejected_magic: self.rejected_magic.load(Ordering::Relaxed),
            rejected_command: self.rejected_command.load(Ordering::Relaxed),
            rejected_version: self.rejected_version.load(Ordering::Relaxed),
            rejected_oversize: self.rejected_oversize.load(Ordering::Relaxed),
            rejected_checksum: self.rejected_checksum.load(Ordering::Relaxed),
            rejected_payload: self.rejected_payload.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            messages_encoded = snapshot.messages_encoded,
            messages_decoded = snapshot.messages_decoded,
            bytes_encoded = snapshot.bytes_encoded,
            bytes_decoded = snapshot.bytes_decoded,
            rejected = snapshot.rejected_total(),
            rejected_checksum = snapshot.rejected_checksum,
            rejected_payload = snapshot.rejected_payload,
            encode_errors = snapshot.encode_errors,
            timeouts = snapshot.timeouts,
            cancellations = snapshot.cancellations,
            uptime_seconds = snapshot.uptime_seconds,
            "Codec metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_encoded: u64,
    pub messages_decoded: u64,
    pub bytes_encoded: u64,
    pub bytes_decoded: u64,
    pub rejected_magic: u64,
    pub rejected_command: u64,
    pub rejected_version: u64,
    pub rejected_oversize: u64,
    pub rejected_checksum: u64,
    pub rejected_payload: u64,
    pub encode_errors: u64,
    pub timeouts: u64,
    pub cancellations: u64,
    pub uptime_seconds: u64,
}

impl MetricsSnapshot {
    /// All frames refused by the decoder
    pub fn rejected_total(&self) -> u64 {
        self.rejected_magic
            + self.rejected_command
            + self.rejected_version
            + self.rejected_oversize
            + self.rejected_checksum
            + self.rejected_payload
    }
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

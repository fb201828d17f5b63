//! # Error Types
//!
//! Error handling for the wire codec.
//!
//! Every variant carries enough context (field, byte offset, command) to
//! diagnose an interoperability bug from the error text alone, without
//! re-running the exchange under a dumper.
//!
//! ## Error Categories
//! - **Structural**: short reads, malformed or non-canonical varints, bad lengths
//! - **Envelope**: unknown commands, oversized payloads, checksum mismatches, foreign magic
//! - **Sink / Source**: write failures, timeouts, cancellation, closed connections
//! - **Configuration**: invalid or unreadable settings
//!
//! Decode errors are never recovered from inside the codec. The caller (the
//! transport layer) decides whether to drop the connection.
//!
//! ## Example Usage
//! ```rust
//! use p2p_wire::core::varint::decode_varint;
//! use p2p_wire::error::WireError;
//!
//! match decode_varint(&[0xfd, 0x10, 0x00]) {
//!     Err(WireError::NonCanonicalVarInt { value, .. }) => assert_eq!(value, 16),
//!     other => unreachable!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Primary error type for all codec operations
#[derive(Error, Debug)]
pub enum WireError {
    #[error("invalid length for {field}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid encoding for {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error(
        "malformed varint at offset {offset}: marker {marker:#04x} needs {needed} bytes, {available} available"
    )]
    MalformedVarInt {
        offset: usize,
        marker: u8,
        needed: usize,
        available: usize,
    },

    #[error(
        "non-canonical varint at offset {offset}: marker {marker:#04x} encodes {value}, which must be at least {min}"
    )]
    NonCanonicalVarInt {
        offset: usize,
        marker: u8,
        value: u64,
        min: u64,
    },

    #[error(
        "unexpected end of input reading {field} at offset {offset}: needed {needed} bytes, {available} available"
    )]
    UnexpectedEof {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("unknown command {command:?}")]
    UnknownCommand { command: String },

    #[error("invalid command field {command:?}: {reason}")]
    InvalidCommand { command: String, reason: &'static str },

    #[error("payload for {command} too large: {length} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        command: String,
        length: usize,
        max: usize,
    },

    #[error("checksum mismatch for {command}: header {expected:02x?}, computed {actual:02x?}")]
    ChecksumMismatch {
        command: String,
        expected: [u8; 4],
        actual: [u8; 4],
    },

    #[error("network magic mismatch: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("{command} requires protocol version {required}, negotiated {negotiated}")]
    CommandNotSupported {
        command: &'static str,
        required: u32,
        negotiated: u32,
    },

    #[error("too many elements in {field} at offset {offset}: {count} exceeds maximum {max}")]
    TooManyElements {
        field: &'static str,
        offset: usize,
        count: u64,
        max: u64,
    },

    #[error("{command}.{field} is required at protocol version {version}")]
    MissingField {
        command: &'static str,
        field: &'static str,
        version: u32,
    },

    #[error("failed to decode {command} payload: {source}")]
    Payload {
        command: &'static str,
        #[source]
        source: Box<WireError>,
    },

    #[error("write failed for {field}: {source}")]
    WriteError {
        field: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("connection codec rejected after a fatal decode error")]
    ConnectionRejected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl WireError {
    /// Whether the error leaves the stream in an unknown position.
    ///
    /// Fatal errors move a connection's framing state to `Rejected`.
    pub fn is_fatal(&self) -> bool {
        match self {
            WireError::Payload { .. }
            | WireError::UnknownCommand { .. }
            | WireError::InvalidCommand { .. }
            | WireError::PayloadTooLarge { .. }
            | WireError::ChecksumMismatch { .. }
            | WireError::InvalidMagic { .. }
            | WireError::CommandNotSupported { .. }
            | WireError::UnexpectedEof { .. }
            | WireError::MalformedVarInt { .. }
            | WireError::NonCanonicalVarInt { .. }
            | WireError::TooManyElements { .. }
            | WireError::InvalidLength { .. }
            | WireError::InvalidEncoding { .. }
            | WireError::ConnectionRejected => true,
            WireError::MissingField { .. }
            | WireError::WriteError { .. }
            | WireError::Timeout(_)
            | WireError::Cancelled
            | WireError::ConnectionClosed
            | WireError::Io(_)
            | WireError::ConfigError(_) => false,
        }
    }

    /// The innermost error, looking through `Payload` wrappers.
    pub fn root(&self) -> &WireError {
        match self {
            WireError::Payload { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short stable label, used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self.root() {
            WireError::InvalidLength { .. } => "invalid_length",
            WireError::InvalidEncoding { .. } => "invalid_encoding",
            WireError::MalformedVarInt { .. } => "malformed_varint",
            WireError::NonCanonicalVarInt { .. } => "non_canonical_varint",
            WireError::UnexpectedEof { .. } => "unexpected_eof",
            WireError::UnknownCommand { .. } => "unknown_command",
            WireError::InvalidCommand { .. } => "invalid_command",
            WireError::PayloadTooLarge { .. } => "payload_too_large",
            WireError::ChecksumMismatch { .. } => "checksum_mismatch",
            WireError::InvalidMagic { .. } => "invalid_magic",
            WireError::CommandNotSupported { .. } => "command_not_supported",
            WireError::TooManyElements { .. } => "too_many_elements",
            WireError::MissingField { .. } => "missing_field",
            WireError::Payload { .. } => "payload",
            WireError::WriteError { .. } => "write_error",
            WireError::Timeout(_) => "timeout",
            WireError::Cancelled => "cancelled",
            WireError::ConnectionRejected => "connection_rejected",
            WireError::ConnectionClosed => "connection_closed",
            WireError::Io(_) => "io",
            WireError::ConfigError(_) => "config",
        }
    }

    pub(crate) fn in_payload(self, command: &'static str) -> Self {
        match self {
            WireError::Payload { .. } => self,
            other => WireError::Payload {
                command,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn write(field: &'static str) -> impl FnOnce(io::Error) -> WireError {
        move |source| WireError::WriteError { field, source }
    }
}

/// Type alias for Results using WireError
pub type Result<T> = std::result::Result<T, WireError>;

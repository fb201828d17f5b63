//! # Protocol Layer
//!
//! Messages, version negotiation and the codecs that frame them.
//!
//! ## Components
//! - **version**: protocol version numbers and the per-connection capability table
//! - **message**: typed payloads with version-gated fields
//! - **registry**: command to payload decoder table, built once
//! - **codec**: stateless frame encode/decode over buffers and blocking I/O
//! - **framing**: per-connection `tokio_util` codec with a rejecting state machine
//!
//! ## Flow
//! 1. Both sides exchange `version` under [`Capabilities::latest`](version::Capabilities::latest)
//! 2. Each side derives the negotiated capabilities from the peer's version
//! 3. All later frames are encoded and decoded with those capabilities

pub mod codec;
pub mod framing;
pub mod message;
pub mod registry;
pub mod version;

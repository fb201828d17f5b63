//! # Service Layer
//!
//! Async connection wrapper over the framing codec.
//!
//! ## Components
//! - **WireStream**: framed send/recv with per-operation deadlines and cancellation
//!
//! Connection lifecycle (dialing, handshake policy, reconnects) belongs to
//! the node, not to this crate.

pub mod stream;

pub use stream::WireStream;

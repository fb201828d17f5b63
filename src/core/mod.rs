//! # Core Wire Primitives
//!
//! Fixed-layout building blocks every protocol message is made of.
//!
//! ## Components
//! - **ContentHash**: 32-byte identifier with reversed-hex display form
//! - **VarInt**: canonical variable-length integers and prefixed strings
//! - **InventoryVector**: 32-byte object announcement / request record
//! - **NetAddress**: services + IPv6 + port record used by `version`
//! - **Command**: NUL-padded 12-byte command names
//! - **Network**: header magic values
//! - **MessageEnvelope**: the 24-byte header
//! - **WireReader**: offset-tracking cursor used by all decoders
//!
//! ## Wire Format
//! ```text
//! [Magic(4)] [Command(12)] [Length(4)] [Checksum(4)] [Payload(N)]
//! ```
//!
//! ## Security
//! - Length prefixes are checked against per-field maxima before allocating
//! - Non-canonical varints are rejected
//! - Short reads never yield partially populated values

pub mod command;
pub mod envelope;
pub mod hash;
pub mod inventory;
pub mod netaddr;
pub mod network;
pub mod varint;
pub mod wire;

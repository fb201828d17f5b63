//! # p2p-wire
//!
//! Byte-exact wire codec for the messages peers of a blockchain network
//! exchange: content hashes, inventory vectors, variable-length integers
//! and the 24-byte envelope every message rides in.
//!
//! ## Layers
//! - [`core`]: fixed-layout primitives and the message header
//! - [`protocol`]: typed messages, version gating, registry and codecs
//! - [`service`]: async stream with deadlines and cancellation
//! - [`utils`]: checksum, logging, metrics, timeouts
//! - [`config`]: TOML / environment configuration
//!
//! ## Example
//! ```rust
//! use p2p_wire::core::hash::ContentHash;
//! use p2p_wire::core::inventory::InventoryVector;
//! use p2p_wire::core::network::Network;
//! use p2p_wire::protocol::codec::Codec;
//! use p2p_wire::protocol::message::Message;
//! use p2p_wire::protocol::version::Capabilities;
//!
//! let codec = Codec::new(Network::Mainnet);
//! let caps = Capabilities::latest();
//! let hash: ContentHash = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
//!     .parse()
//!     .unwrap();
//!
//! let frame = codec.encode(&Message::GetData(vec![InventoryVector::new(hash)]), &caps).unwrap();
//! let (msg, used) = codec.decode(&frame, &caps).unwrap();
//! assert_eq!(used, frame.len());
//! assert_eq!(msg, Message::GetData(vec![InventoryVector::new(hash)]));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod utils;

pub use crate::core::hash::ContentHash;
pub use crate::core::inventory::InventoryVector;
pub use crate::core::network::Network;
pub use crate::error::{Result, WireError};
pub use crate::protocol::codec::Codec;
pub use crate::protocol::framing::MessageCodec;
pub use crate::protocol::message::Message;
pub use crate::protocol::version::{Capabilities, ProtocolVersion};

//! # Protocol Messages
//!
//! Typed payloads for every command the codec frames, with their field
//! order fixed by the wire format.
//!
//! ## Version-gated fields
//! Fields introduced by a later protocol version are `Option`s. When the
//! connection's [`Capabilities`] lack the feature the encoder writes no
//! bytes for the field and the decoder never tries to read it, leaving
//! it `None`. Consequently `decode(encode(m, caps), caps) == m` holds for
//! every message already normalized for `caps` (see
//! [`Message::normalized`]).

use crate::core::command::Command;
use crate::core::hash::ContentHash;
use crate::core::inventory::InventoryVector;
use crate::core::netaddr::NetAddress;
use crate::core::varint::{write_var_string, write_varint};
use crate::core::wire::{Decodable, Encodable, WireReader};
use crate::error::{Result, WireError};
use crate::protocol::version::Capabilities;
use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

/// Maximum inventory vectors in one `inv`, `getdata` or `notfound`
pub const MAX_INV_PER_MSG: usize = 50_000;

/// Maximum locator hashes in `getblocks` / `getheaders`
pub const MAX_BLOCK_LOCATORS_PER_MSG: usize = 500;

/// Maximum user agent length in `version`
pub const MAX_USER_AGENT_LEN: usize = 256;

/// Payload of the `version` handshake message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMessage {
    pub protocol_version: i32,
    pub services: u64,
    pub timestamp: i64,
    pub addr_recv: NetAddress,
    pub addr_from: NetAddress,
    pub nonce: u64,
    pub user_agent: String,
    pub start_height: i32,
    /// Present from BIP 37 on; `None` when the peer did not send it.
    pub relay: Option<bool>,
}

// Offset of the user agent length inside a version payload
const USER_AGENT_OFFSET: usize = 4 + 8 + 8 + 26 + 26 + 8;

impl VersionMessage {
    fn encode<W: Write + ?Sized>(&self, w: &mut W, caps: &Capabilities) -> Result<()> {
        if self.user_agent.len() > MAX_USER_AGENT_LEN {
            return Err(WireError::TooManyElements {
                field: "version.user_agent",
                offset: USER_AGENT_OFFSET,
                count: self.user_agent.len() as u64,
                max: MAX_USER_AGENT_LEN as u64,
            });
        }

        w.write_i32::<LittleEndian>(self.protocol_version)
            .map_err(WireError::write("version.protocol_version"))?;
        w.write_u64::<LittleEndian>(self.services)
            .map_err(WireError::write("version.services"))?;
        w.write_i64::<LittleEndian>(self.timestamp)
            .map_err(WireError::write("version.timestamp"))?;
        self.addr_recv.encode(w)?;
        self.addr_from.encode(w)?;
        w.write_u64::<LittleEndian>(self.nonce)
            .map_err(WireError::write("version.nonce"))?;
        write_var_string(w, &self.user_agent, "version.user_agent")?;
        w.write_i32::<LittleEndian>(self.start_height)
            .map_err(WireError::write("version.start_height"))?;

        match self.relay {
            Some(relay) if caps.relay_flag => w
                .write_u8(u8::from(relay))
                .map_err(WireError::write("version.relay")),
            Some(_) => {
                debug!(version = %caps.version(), "omitting relay flag below BIP 37");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn decode(r: &mut WireReader<'_>, caps: &Capabilities) -> Result<Self> {
        let protocol_version = r.read_i32_le("version.protocol_version")?;
        let services = r.read_u64_le("version.services")?;
        let timestamp = r.read_i64_le("version.timestamp")?;
        let addr_recv = NetAddress::decode(r)?;
        let addr_from = NetAddress::decode(r)?;
        let nonce = r.read_u64_le("version.nonce")?;
        let user_agent = r.read_var_string(MAX_USER_AGENT_LEN, "version.user_agent")?;
        let start_height = r.read_i32_le("version.start_height")?;

        // Peers at BIP 37 may still leave the flag off; treat it as absent.
        let relay = if caps.relay_flag && !r.is_empty() {
            Some(r.read_bool("version.relay")?)
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            services,
            timestamp,
            addr_recv,
            addr_from,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }
}

/// Payload shared by `getblocks` and `getheaders`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLocator {
    pub protocol_version: u32,
    /// Newest first
    pub locator_hashes: Vec<ContentHash>,
    /// Zero to ask for as many as the peer will send
    pub hash_stop: ContentHash,
}

impl BlockLocator {
    pub fn new(protocol_version: u32, hash_stop: ContentHash) -> Self {
        Self {
            protocol_version,
            locator_hashes: Vec::new(),
            hash_stop,
        }
    }

    /// Append a locator hash, refusing to grow past the wire limit.
    pub fn add_locator(&mut self, hash: ContentHash) -> Result<()> {
        if self.locator_hashes.len() + 1 > MAX_BLOCK_LOCATORS_PER_MSG {
            return Err(WireError::TooManyElements {
                field: "locator_hashes",
                offset: 4,
                count: self.locator_hashes.len() as u64 + 1,
                max: MAX_BLOCK_LOCATORS_PER_MSG as u64,
            });
        }
        self.locator_hashes.push(hash);
        Ok(())
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        if self.locator_hashes.len() > MAX_BLOCK_LOCATORS_PER_MSG {
            return Err(WireError::TooManyElements {
                field: "locator_hashes",
                offset: 4,
                count: self.locator_hashes.len() as u64,
                max: MAX_BLOCK_LOCATORS_PER_MSG as u64,
            });
        }

        w.write_u32::<LittleEndian>(self.protocol_version)
            .map_err(WireError::write("locator.protocol_version"))?;
        write_varint(w, self.locator_hashes.len() as u64)?;
        for hash in &self.locator_hashes {
            hash.encode(w)?;
        }
        self.hash_stop.encode(w)
    }

    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let protocol_version = r.read_u32_le("locator.protocol_version")?;
        let count = r.read_count(MAX_BLOCK_LOCATORS_PER_MSG as u64, "locator_hashes")?;
        let mut locator_hashes = Vec::with_capacity(count);
        for _ in 0..count {
            locator_hashes.push(ContentHash::decode(r)?);
        }
        let hash_stop = ContentHash::decode(r)?;

        Ok(Self {
            protocol_version,
            locator_hashes,
            hash_stop,
        })
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Version(VersionMessage),
    Verack,
    GetAddr,
    /// Nonce present strictly above BIP 31
    Ping { nonce: Option<u64> },
    Pong { nonce: u64 },
    Inv(Vec<InventoryVector>),
    GetData(Vec<InventoryVector>),
    NotFound(Vec<InventoryVector>),
    GetBlocks(BlockLocator),
    GetHeaders(BlockLocator),
    MemPool,
    SendHeaders,
    FeeFilter { min_fee: i64 },
}

impl Message {
    pub fn command(&self) -> Command {
        match self {
            Message::Version(_) => Command::Version,
            Message::Verack => Command::Verack,
            Message::GetAddr => Command::GetAddr,
            Message::Ping { .. } => Command::Ping,
            Message::Pong { .. } => Command::Pong,
            Message::Inv(_) => Command::Inv,
            Message::GetData(_) => Command::GetData,
            Message::NotFound(_) => Command::NotFound,
            Message::GetBlocks(_) => Command::GetBlocks,
            Message::GetHeaders(_) => Command::GetHeaders,
            Message::MemPool => Command::MemPool,
            Message::SendHeaders => Command::SendHeaders,
            Message::FeeFilter { .. } => Command::FeeFilter,
        }
    }

    /// A ping shaped for the connection: nonce only where it is carried
    pub fn ping(caps: &Capabilities, nonce: u64) -> Message {
        Message::Ping {
            nonce: caps.ping_nonce.then_some(nonce),
        }
    }

    /// Clear gated fields that `caps` cannot carry.
    ///
    /// The result is what a peer at that version would decode.
    pub fn normalized(mut self, caps: &Capabilities) -> Message {
        match &mut self {
            Message::Ping { nonce } if !caps.ping_nonce => *nonce = None,
            Message::Version(v) if !caps.relay_flag => v.relay = None,
            _ => {}
        }
        self
    }

    /// Write the payload (no header) for the given capabilities.
    ///
    /// Gated fields the capabilities cannot carry are dropped, so the
    /// decoded message equals `self.normalized(caps)`, not `self`.
    ///
    /// # Errors
    /// - `TooManyElements` when a list or string exceeds its wire limit
    /// - `MissingField` when a gated field the version requires is `None`
    /// - `WriteError` when the sink fails
    pub fn encode_payload<W: Write + ?Sized>(&self, w: &mut W, caps: &Capabilities) -> Result<()> {
        match self {
            Message::Version(v) => v.encode(w, caps),
            Message::Verack | Message::GetAddr | Message::MemPool | Message::SendHeaders => Ok(()),
            Message::Ping { nonce } => match (caps.ping_nonce, nonce) {
                (true, Some(nonce)) => w
                    .write_u64::<LittleEndian>(*nonce)
                    .map_err(WireError::write("ping.nonce")),
                (true, None) => Err(WireError::MissingField {
                    command: "ping",
                    field: "nonce",
                    version: caps.version().get(),
                }),
                (false, Some(_)) => {
                    debug!(version = %caps.version(), "omitting ping nonce at or below BIP 31");
                    Ok(())
                }
                (false, None) => Ok(()),
            },
            Message::Pong { nonce } => w
                .write_u64::<LittleEndian>(*nonce)
                .map_err(WireError::write("pong.nonce")),
            Message::Inv(list) | Message::GetData(list) | Message::NotFound(list) => {
                encode_inv_list(w, list)
            }
            Message::GetBlocks(locator) | Message::GetHeaders(locator) => locator.encode(w),
            Message::FeeFilter { min_fee } => w
                .write_i64::<LittleEndian>(*min_fee)
                .map_err(WireError::write("feefilter.min_fee")),
        }
    }

    /// Payload bytes for the given capabilities
    pub fn to_payload(&self, caps: &Capabilities) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_payload(&mut out, caps)?;
        Ok(out)
    }
}

fn encode_inv_list<W: Write + ?Sized>(w: &mut W, list: &[InventoryVector]) -> Result<()> {
    if list.len() > MAX_INV_PER_MSG {
        return Err(WireError::TooManyElements {
            field: "inv_list",
            offset: 0,
            count: list.len() as u64,
            max: MAX_INV_PER_MSG as u64,
        });
    }
    write_varint(w, list.len() as u64)?;
    for iv in list {
        iv.encode(w)?;
    }
    Ok(())
}

fn decode_inv_list(r: &mut WireReader<'_>) -> Result<Vec<InventoryVector>> {
    let count = r.read_count(MAX_INV_PER_MSG as u64, "inv_list")?;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(InventoryVector::decode(r)?);
    }
    Ok(list)
}

/// Payload decoders, one per command, in the shape the registry stores.
pub mod decode {
    use super::*;

    pub fn version(r: &mut WireReader<'_>, caps: &Capabilities) -> Result<Message> {
        Ok(Message::Version(VersionMessage::decode(r, caps)?))
    }

    pub fn verack(_: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::Verack)
    }

    pub fn getaddr(_: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::GetAddr)
    }

    pub fn ping(r: &mut WireReader<'_>, caps: &Capabilities) -> Result<Message> {
        let nonce = if caps.ping_nonce {
            Some(r.read_u64_le("ping.nonce")?)
        } else {
            None
        };
        Ok(Message::Ping { nonce })
    }

    pub fn pong(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::Pong {
            nonce: r.read_u64_le("pong.nonce")?,
        })
    }

    pub fn inv(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::Inv(decode_inv_list(r)?))
    }

    pub fn getdata(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::GetData(decode_inv_list(r)?))
    }

    pub fn notfound(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::NotFound(decode_inv_list(r)?))
    }

    pub fn getblocks(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::GetBlocks(BlockLocator::decode(r)?))
    }

    pub fn getheaders(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::GetHeaders(BlockLocator::decode(r)?))
    }

    pub fn mempool(_: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::MemPool)
    }

    pub fn sendheaders(_: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::SendHeaders)
    }

    pub fn feefilter(r: &mut WireReader<'_>, _: &Capabilities) -> Result<Message> {
        Ok(Message::FeeFilter {
            min_fee: r.read_i64_le("feefilter.min_fee")?,
        })
    }
}

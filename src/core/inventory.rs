//! # Inventory vectors
//!
//! An inventory vector names one network object in `inv`, `getdata` and
//! `notfound` exchanges.
//!
//! On this network the wire form is the 32-byte hash and nothing else:
//! there is no type discriminator in front of it. Code that needs to
//! know whether a vector refers to a block or a transaction attaches the
//! type out-of-band with [`TypedInventory`], which is never serialized.

use crate::core::hash::{ContentHash, HASH_SIZE};
use crate::core::wire::{Decodable, Encodable, WireReader};
use crate::error::{Result, WireError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Wire size of one inventory vector
pub const INV_VECT_SIZE: usize = HASH_SIZE;

/// Identifies a network object by content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InventoryVector {
    pub hash: ContentHash,
}

impl InventoryVector {
    pub fn new(hash: ContentHash) -> Self {
        Self { hash }
    }

    /// Attach an item type that travels beside the vector, not on the wire.
    pub fn typed(self, kind: InvType) -> TypedInventory {
        TypedInventory { kind, vector: self }
    }
}

impl From<ContentHash> for InventoryVector {
    fn from(hash: ContentHash) -> Self {
        Self::new(hash)
    }
}

impl Encodable for InventoryVector {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_all(self.hash.as_bytes())
            .map_err(WireError::write("inv_vect.hash"))
    }

    fn encoded_len(&self) -> usize {
        INV_VECT_SIZE
    }
}

impl Decodable for InventoryVector {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self> {
        let bytes = reader.read_array::<INV_VECT_SIZE>("inv_vect.hash")?;
        Ok(Self::new(ContentHash::from_array(bytes)))
    }
}

/// Kind of object an inventory vector refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum InvType {
    Error = 0,
    Tx = 1,
    Block = 2,
    FilteredBlock = 3,
}

impl InvType {
    pub fn as_str(self) -> &'static str {
        match self {
            InvType::Error => "ERROR",
            InvType::Tx => "MSG_TX",
            InvType::Block => "MSG_BLOCK",
            InvType::FilteredBlock => "MSG_FILTERED_BLOCK",
        }
    }
}

impl TryFrom<u32> for InvType {
    type Error = WireError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(InvType::Error),
            1 => Ok(InvType::Tx),
            2 => Ok(InvType::Block),
            3 => Ok(InvType::FilteredBlock),
            other => Err(WireError::InvalidEncoding {
                field: "inv_type",
                reason: format!("unknown inventory type {other}"),
            }),
        }
    }
}

impl fmt::Display for InvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory vector paired with its item type.
///
/// The type is local knowledge of whoever built or received the vector
/// (for example a `getdata` issued in reply to a block announcement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypedInventory {
    pub kind: InvType,
    pub vector: InventoryVector,
}

impl TypedInventory {
    /// Drop the type, keeping only what goes on the wire
    pub fn into_vector(self) -> InventoryVector {
        self.vector
    }

    /// True for the zero-hash sentinel or an explicit `Error` type
    pub fn is_error(&self) -> bool {
        self.kind == InvType::Error || self.vector.hash.is_zero()
    }
}

impl fmt::Display for TypedInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.vector.hash)
    }
}

//! Network address record as it appears inside the `version` message:
//! services bitfield, 16-byte IPv6 address (IPv4 is mapped), big-endian port.

use crate::core::wire::{Decodable, Encodable, WireReader};
use crate::error::{Result, WireError};
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Wire size of a version-message address (no timestamp)
pub const NET_ADDRESS_SIZE: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetAddress {
    pub services: u64,
    pub ip: IpAddr,
    pub port: u16,
}

impl NetAddress {
    pub fn new(ip: IpAddr, port: u16, services: u64) -> Self {
        Self { services, ip, port }
    }

    /// The all-zero address peers send when they do not know their own
    pub fn unspecified(services: u64) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0, services)
    }

    fn ip_bytes(&self) -> [u8; 16] {
        match self.ip {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        }
    }
}

impl Encodable for NetAddress {
    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer
            .write_u64::<LittleEndian>(self.services)
            .map_err(WireError::write("net_address.services"))?;
        writer
            .write_all(&self.ip_bytes())
            .map_err(WireError::write("net_address.ip"))?;
        writer
            .write_u16::<BigEndian>(self.port)
            .map_err(WireError::write("net_address.port"))
    }

    fn encoded_len(&self) -> usize {
        NET_ADDRESS_SIZE
    }
}

impl Decodable for NetAddress {
    fn decode(reader: &mut WireReader<'_>) -> Result<Self> {
        let services = reader.read_u64_le("net_address.services")?;
        let raw: [u8; 16] = reader.read_array("net_address.ip")?;
        let port = reader.read_u16_be("net_address.port")?;

        let v6 = Ipv6Addr::from(raw);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };

        Ok(Self { services, ip, port })
    }
}

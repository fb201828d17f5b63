//! Property-based tests using proptest
//!
//! These tests check codec invariants across randomly generated values
//! and arbitrary byte input.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use p2p_wire::core::hash::ContentHash;
use p2p_wire::core::inventory::InventoryVector;
use p2p_wire::core::netaddr::NetAddress;
use p2p_wire::core::varint::{decode_varint, encode_varint, varint_len};
use p2p_wire::core::wire::{Decodable, Encodable, WireReader};
use p2p_wire::protocol::message::{BlockLocator, Message, VersionMessage};
use p2p_wire::{Capabilities, Codec, MessageCodec, Network, ProtocolVersion};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tokio_util::codec::Decoder;

fn any_hash() -> impl Strategy<Value = ContentHash> + Clone {
    any::<[u8; 32]>().prop_map(ContentHash::from_array)
}

fn any_version() -> impl Strategy<Value = ProtocolVersion> {
    prop_oneof![
        Just(ProtocolVersion::MIN),
        Just(ProtocolVersion::BIP0031),
        Just(ProtocolVersion(60001)),
        Just(ProtocolVersion::BIP0035),
        Just(ProtocolVersion(70000)),
        Just(ProtocolVersion::BIP0037),
        Just(ProtocolVersion::SEND_HEADERS),
        Just(ProtocolVersion::FEE_FILTER),
        (209u32..=70013).prop_map(ProtocolVersion),
    ]
}

fn any_addr() -> impl Strategy<Value = NetAddress> {
    (any::<u64>(), any::<bool>(), any::<[u8; 16]>(), any::<u16>()).prop_map(
        |(services, v4, raw, port)| {
            let ip = if v4 {
                IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
            } else {
                // Skip the v4-mapped range, which decodes back as V4.
                let mut raw = raw;
                raw[0] |= 0x20;
                IpAddr::V6(Ipv6Addr::from(raw))
            };
            NetAddress::new(ip, port, services)
        },
    )
}

fn any_message() -> impl Strategy<Value = Message> {
    let inv = prop::collection::vec(any_hash().prop_map(InventoryVector::new), 0..40);
    let locator = (any::<u32>(), prop::collection::vec(any_hash(), 0..20), any_hash()).prop_map(
        |(protocol_version, locator_hashes, hash_stop)| BlockLocator {
            protocol_version,
            locator_hashes,
            hash_stop,
        },
    );
    let version = (
        any::<i32>(),
        any::<u64>(),
        any::<i64>(),
        any_addr(),
        any_addr(),
        any::<u64>(),
        "[ -~]{0,64}",
        any::<i32>(),
        any::<Option<bool>>(),
    )
        .prop_map(
            |(protocol_version, services, timestamp, addr_recv, addr_from, nonce, user_agent, start_height, relay)| {
                Message::Version(VersionMessage {
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
            },
        );

    prop_oneof![
        version,
        Just(Message::Verack),
        Just(Message::GetAddr),
        any::<u64>().prop_map(|n| Message::Ping { nonce: Some(n) }),
        any::<u64>().prop_map(|nonce| Message::Pong { nonce }),
        inv.clone().prop_map(Message::Inv),
        inv.clone().prop_map(Message::GetData),
        inv.prop_map(Message::NotFound),
        locator.clone().prop_map(Message::GetBlocks),
        locator.prop_map(Message::GetHeaders),
        Just(Message::MemPool),
        Just(Message::SendHeaders),
        any::<i64>().prop_map(|min_fee| Message::FeeFilter { min_fee }),
    ]
}

proptest! {
    #[test]
    fn prop_hash_string_roundtrip(hash in any_hash()) {
        let text = hash.to_string();
        prop_assert_eq!(text.len(), 64);
        prop_assert_eq!(ContentHash::parse(&text).unwrap(), hash);
    }

    #[test]
    fn prop_inventory_vector_is_32_bytes(hash in any_hash()) {
        let iv = InventoryVector::new(hash);
        let bytes = iv.to_wire_bytes();
        prop_assert_eq!(bytes.len(), 32);
        prop_assert_eq!(InventoryVector::decode(&mut WireReader::new(&bytes)).unwrap(), iv);
    }

    #[test]
    fn prop_varint_roundtrip_is_minimal(value in any::<u64>()) {
        let bytes = encode_varint(value);
        prop_assert_eq!(bytes.len(), varint_len(value));
        prop_assert_eq!(decode_varint(&bytes).unwrap(), (value, bytes.len()));
    }

    // Every message the negotiated version can express survives a round trip.
    #[test]
    fn prop_message_roundtrip(msg in any_message(), version in any_version()) {
        let caps = Capabilities::for_version(version);
        let codec = Codec::new(Network::Regtest);
        let spec = *codec.registry().lookup(msg.command()).unwrap();
        prop_assume!(caps.supports(spec.min_version));

        let msg = msg.normalized(&caps);
        let frame = codec.encode(&msg, &caps).unwrap();
        let (decoded, used) = codec.decode(&frame, &caps).unwrap();
        prop_assert_eq!(used, frame.len());
        prop_assert_eq!(decoded, msg);
    }

    // Splitting a frame stream at arbitrary points never changes what comes out.
    #[test]
    fn prop_framing_is_split_invariant(
        msgs in prop::collection::vec(any_message(), 1..6),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let caps = Capabilities::latest();
        let codec = Codec::new(Network::Regtest);
        let msgs: Vec<Message> = msgs.into_iter().map(|m| m.normalized(&caps)).collect();

        let mut wire = Vec::new();
        for msg in &msgs {
            wire.extend(codec.encode(msg, &caps).unwrap());
        }

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(wire.len() + 1)).collect();
        points.push(wire.len());
        points.sort_unstable();

        let mut framing = MessageCodec::new(codec, caps);
        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        let mut start = 0;
        for end in points {
            buf.extend_from_slice(&wire[start..end]);
            start = end;
            while let Some(msg) = framing.decode(&mut buf).unwrap() {
                out.push(msg);
            }
        }
        prop_assert_eq!(out, msgs);
        prop_assert!(buf.is_empty());
    }

    // Arbitrary bytes never panic the decoder.
    #[test]
    fn prop_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Codec::new(Network::Regtest).decode(&data, &Capabilities::latest());
    }

    // Arbitrary payloads behind a valid header never panic either.
    #[test]
    fn prop_payload_decode_never_panics(
        command in prop::sample::select(vec![
            "version", "verack", "getaddr", "ping", "pong", "inv", "getdata",
            "notfound", "getblocks", "getheaders", "mempool", "sendheaders", "feefilter",
        ]),
        payload in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        use p2p_wire::core::envelope::MessageEnvelope;
        use p2p_wire::utils::checksum::{Checksum, DoubleSha256};

        let mut field = [0u8; 12];
        field[..command.len()].copy_from_slice(command.as_bytes());
        let envelope = MessageEnvelope {
            magic: Network::Regtest.magic(),
            command: field,
            length: payload.len() as u32,
            checksum: DoubleSha256.checksum(&payload),
        };
        let mut frame = envelope.to_bytes().to_vec();
        frame.extend_from_slice(&payload);

        let _ = Codec::new(Network::Regtest).decode(&frame, &Capabilities::latest());
    }
}

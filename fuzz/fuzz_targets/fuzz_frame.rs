#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use p2p_wire::{Capabilities, Codec, MessageCodec, Network, ProtocolVersion};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // First byte picks the negotiated version so gated paths get exercised too.
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };
    let version = match selector % 4 {
        0 => ProtocolVersion::BIP0031,
        1 => ProtocolVersion::BIP0035,
        2 => ProtocolVersion(70000),
        _ => ProtocolVersion::LATEST,
    };
    let caps = Capabilities::for_version(version);
    let codec = Codec::new(Network::Mainnet).with_max_payload(1 << 20);

    let _ = codec.decode(frame, &caps);

    let mut framing = MessageCodec::new(codec, caps);
    let mut buf = BytesMut::from(frame);
    while let Ok(Some(_)) = framing.decode(&mut buf) {}
    let _ = framing.decode_eof(&mut buf);
});

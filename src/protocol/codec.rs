//! # Codec
//!
//! Stateless encode/decode entry points for complete frames.
//!
//! A [`Codec`] holds only immutable settings (network magic, payload
//! ceiling, checksum and command registry) and can be cloned cheaply or
//! shared behind an `Arc`. Every call works on caller-owned buffers, so
//! any number of connections may encode and decode concurrently.
//!
//! ## Decode order
//! 1. header (24 bytes)
//! 2. magic
//! 3. command name and registry lookup
//! 4. command minimum version
//! 5. declared length against the ceiling
//! 6. payload bytes present
//! 7. checksum
//! 8. payload decoder
//!
//! The first failing step decides the error; nothing after it runs.

use crate::config::{CodecConfig, MAX_PAYLOAD_SIZE};
use crate::core::command::Command;
use crate::core::envelope::{MessageEnvelope, HEADER_SIZE};
use crate::core::network::Network;
use crate::core::wire::WireReader;
use crate::error::{Result, WireError};
use crate::protocol::message::Message;
use crate::protocol::registry::{CommandRegistry, CommandSpec};
use crate::protocol::version::Capabilities;
use crate::utils::checksum::{Checksum, DoubleSha256};
use crate::utils::metrics::global_metrics;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use tracing::{debug, instrument, trace, warn};

/// Frame encoder/decoder bound to one network.
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<CommandRegistry>,
    network: Network,
    max_payload: usize,
    checksum: Arc<dyn Checksum>,
}

impl Codec {
    /// Codec for `network` with the standard registry and default limits
    pub fn new(network: Network) -> Self {
        Self {
            registry: Arc::new(CommandRegistry::standard()),
            network,
            max_payload: MAX_PAYLOAD_SIZE,
            checksum: Arc::new(DoubleSha256),
        }
    }

    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new(config.network).with_max_payload(config.max_payload_size)
    }

    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Lower the payload ceiling. Values above `MAX_PAYLOAD_SIZE` are
    /// clamped to it.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        if max_payload > MAX_PAYLOAD_SIZE {
            warn!(
                requested = max_payload,
                max = MAX_PAYLOAD_SIZE,
                "clamping payload ceiling"
            );
        }
        self.max_payload = max_payload.min(MAX_PAYLOAD_SIZE);
        self
    }

    pub fn with_checksum(mut self, checksum: Arc<dyn Checksum>) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Encode a complete frame: header followed by payload.
    ///
    /// # Errors
    /// - `UnknownCommand` if the message's command is not registered
    /// - `CommandNotSupported` below the command's minimum version
    /// - `PayloadTooLarge` when the payload exceeds the configured ceiling
    /// - any payload encoding error (`TooManyElements`, `MissingField`)
    pub fn encode(&self, msg: &Message, caps: &Capabilities) -> Result<Vec<u8>> {
        let result = self.encode_frame(msg, caps);
        match &result {
            Ok(frame) => global_metrics().message_encoded(frame.len()),
            Err(_) => global_metrics().encode_error(),
        }
        result
    }

    fn encode_frame(&self, msg: &Message, caps: &Capabilities) -> Result<Vec<u8>> {
        let command = msg.command();
        self.registry.lookup(command)?.check_version(caps)?;

        let payload = msg.to_payload(caps)?;
        if payload.len() > self.max_payload {
            return Err(WireError::PayloadTooLarge {
                command: command.to_string(),
                length: payload.len(),
                max: self.max_payload,
            });
        }

        let envelope =
            MessageEnvelope::for_payload(self.network, command, &payload, self.checksum.as_ref())?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&envelope.to_bytes());
        frame.extend_from_slice(&payload);
        trace!(%command, len = payload.len(), "encoded frame");
        Ok(frame)
    }

    /// Encode `msg` and write the frame to `writer`.
    ///
    /// Returns the number of bytes written. A failing sink is reported as
    /// `WriteError` carrying the underlying I/O error.
    #[instrument(skip(self, writer, msg, caps), fields(command = %msg.command()), level = "debug")]
    pub fn write_message<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        msg: &Message,
        caps: &Capabilities,
    ) -> Result<usize> {
        let frame = self.encode(msg, caps)?;
        writer
            .write_all(&frame)
            .map_err(WireError::write("frame"))?;
        Ok(frame.len())
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns the message and the number of bytes consumed. Bytes after
    /// the frame are left alone.
    pub fn decode(&self, buf: &[u8], caps: &Capabilities) -> Result<(Message, usize)> {
        let result = self.decode_frame(buf, caps);
        match &result {
            Ok((_, used)) => global_metrics().message_decoded(*used),
            Err(err) => global_metrics().decode_error(err),
        }
        result
    }

    fn decode_frame(&self, buf: &[u8], caps: &Capabilities) -> Result<(Message, usize)> {
        let (envelope, spec) = self.decode_header(buf, caps)?;

        let available = buf.len() - HEADER_SIZE;
        let length = envelope.payload_len();
        if available < length {
            return Err(WireError::UnexpectedEof {
                field: "payload",
                offset: HEADER_SIZE,
                needed: length,
                available,
            });
        }

        let payload = &buf[HEADER_SIZE..HEADER_SIZE + length];
        let msg = self.decode_payload(&envelope, spec, payload, caps)?;
        Ok((msg, HEADER_SIZE + length))
    }

    /// Parse and validate the header at the front of `buf`.
    ///
    /// Checks everything that can be checked before the payload arrives:
    /// magic, command, minimum version and declared length.
    pub fn decode_header(
        &self,
        buf: &[u8],
        caps: &Capabilities,
    ) -> Result<(MessageEnvelope, &CommandSpec)> {
        let envelope = MessageEnvelope::from_bytes(buf)?;
        let spec = self.validate_header(&envelope, caps).inspect_err(|err| {
            warn!(
                command = %envelope.command_label(),
                length = envelope.length,
                error = %err,
                "rejecting frame header"
            );
        })?;
        Ok((envelope, spec))
    }

    /// Header checks, in wire order, for an already parsed envelope.
    pub fn validate_header(
        &self,
        envelope: &MessageEnvelope,
        caps: &Capabilities,
    ) -> Result<&CommandSpec> {
        let expected = self.network.magic();
        if envelope.magic != expected {
            return Err(WireError::InvalidMagic {
                expected,
                actual: envelope.magic,
            });
        }

        let command = Command::from_field(&envelope.command)?;
        let spec = self.registry.lookup(command)?;
        spec.check_version(caps)?;

        if envelope.payload_len() > self.max_payload {
            return Err(WireError::PayloadTooLarge {
                command: command.to_string(),
                length: envelope.payload_len(),
                max: self.max_payload,
            });
        }

        Ok(spec)
    }

    /// Verify the checksum and run the command's payload decoder.
    ///
    /// `payload` must be exactly the `length` bytes the header declared.
    /// Decoder errors are wrapped in `WireError::Payload` naming the
    /// command; offsets inside them count from the start of the frame.
    pub fn decode_payload(
        &self,
        envelope: &MessageEnvelope,
        spec: &CommandSpec,
        payload: &[u8],
        caps: &Capabilities,
    ) -> Result<Message> {
        let command = spec.command.as_str();
        envelope
            .verify(payload, self.checksum.as_ref())
            .inspect_err(|err| warn!(command, error = %err, "rejecting payload"))?;

        let mut reader = WireReader::with_base_offset(payload, HEADER_SIZE);
        let msg = (spec.decode)(&mut reader, caps)
            .map_err(|err| err.in_payload(command))
            .inspect_err(|err| {
                warn!(command, kind = err.kind(), error = %err, "malformed payload");
            })?;

        if !reader.is_empty() {
            debug!(
                command,
                trailing = reader.remaining(),
                "ignoring trailing payload bytes"
            );
        }
        Ok(msg)
    }

    /// Blocking read of exactly one frame from `reader`.
    ///
    /// A source that is already at end-of-stream yields `ConnectionClosed`;
    /// one that ends inside a frame yields `UnexpectedEof`.
    #[instrument(skip(self, reader, caps), level = "debug")]
    pub fn read_message<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        caps: &Capabilities,
    ) -> Result<Message> {
        let result = self.read_frame(reader, caps);
        match &result {
            Ok((_, used)) => global_metrics().message_decoded(*used),
            Err(err) => global_metrics().decode_error(err),
        }
        result.map(|(msg, _)| msg)
    }

    fn read_frame<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        caps: &Capabilities,
    ) -> Result<(Message, usize)> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_full(reader, &mut header)?;
        if got == 0 {
            return Err(WireError::ConnectionClosed);
        }
        if got < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                field: "header",
                offset: 0,
                needed: HEADER_SIZE,
                available: got,
            });
        }

        let (envelope, spec) = self.decode_header(&header, caps)?;

        let length = envelope.payload_len();
        let mut payload = vec![0u8; length];
        let got = read_full(reader, &mut payload)?;
        if got < length {
            return Err(WireError::UnexpectedEof {
                field: "payload",
                offset: HEADER_SIZE,
                needed: length,
                available: got,
            });
        }

        let msg = self.decode_payload(&envelope, spec, &payload, caps)?;
        Ok((msg, HEADER_SIZE + length))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

/// Fill `buf` as far as the source allows; returns the bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::core::hash::ContentHash;
    use crate::core::inventory::InventoryVector;
    use crate::protocol::version::ProtocolVersion;
    use std::io::Cursor;

    fn inv_message() -> Message {
        Message::Inv(vec![
            InventoryVector::new(ContentHash::double_sha256(b"a")),
            InventoryVector::new(ContentHash::double_sha256(b"b")),
        ])
    }

    #[test]
    fn encode_then_decode() {
        let codec = Codec::new(Network::Regtest);
        let caps = Capabilities::latest();
        let frame = codec.encode(&inv_message(), &caps).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 1 + 64);

        let (msg, used) = codec.decode(&frame, &caps).unwrap();
        assert_eq!(msg, inv_message());
        assert_eq!(used, frame.len());
    }

    #[test]
    fn decode_leaves_following_bytes() {
        let codec = Codec::default();
        let caps = Capabilities::latest();
        let mut buf = codec.encode(&Message::Verack, &caps).unwrap();
        buf.extend(codec.encode(&Message::GetAddr, &caps).unwrap());

        let (first, used) = codec.decode(&buf, &caps).unwrap();
        assert_eq!(first, Message::Verack);
        let (second, _) = codec.decode(&buf[used..], &caps).unwrap();
        assert_eq!(second, Message::GetAddr);
    }

    #[test]
    fn foreign_magic_is_rejected_first() {
        let caps = Capabilities::latest();
        let frame = Codec::new(Network::Testnet3)
            .encode(&Message::Verack, &caps)
            .unwrap();
        let err = Codec::new(Network::Mainnet)
            .decode(&frame, &caps)
            .unwrap_err();
        assert!(matches!(err, WireError::InvalidMagic { actual: 0x0709_110b, .. }));
    }

    #[test]
    fn oversize_declared_length_rejected_before_payload() {
        let codec = Codec::default().with_max_payload(16);
        let caps = Capabilities::latest();
        let mut header = Codec::default().encode(&inv_message(), &caps).unwrap();
        header.truncate(HEADER_SIZE);
        match codec.decode(&header, &caps) {
            Err(WireError::PayloadTooLarge { length, max, .. }) => {
                assert_eq!(length, 65);
                assert_eq!(max, 16);
            }
            other => unreachable!("unexpected {other:?}"),
        }
    }

    #[test]
    fn payload_ceiling_never_exceeds_protocol_limit() {
        let codec = Codec::default().with_max_payload(MAX_PAYLOAD_SIZE * 2);
        assert_eq!(codec.max_payload(), MAX_PAYLOAD_SIZE);

        let config = CodecConfig {
            max_payload_size: usize::MAX,
            ..CodecConfig::default()
        };
        assert_eq!(Codec::from_config(&config).max_payload(), MAX_PAYLOAD_SIZE);

        let config = CodecConfig {
            max_payload_size: 1024,
            ..config
        };
        assert_eq!(Codec::from_config(&config).max_payload(), 1024);
    }

    #[test]
    fn encode_refuses_commands_above_negotiated_version() {
        let caps = Capabilities::for_version(ProtocolVersion(70001));
        let err = Codec::default()
            .encode(&Message::SendHeaders, &caps)
            .unwrap_err();
        assert!(matches!(err, WireError::CommandNotSupported { required: 70012, .. }));
    }

    #[test]
    fn payload_errors_name_the_command_and_frame_offset() {
        let codec = Codec::default();
        let caps = Capabilities::latest();
        let mut frame = codec.encode(&inv_message(), &caps).unwrap();
        // Claim three vectors while carrying two, then fix up the checksum.
        frame[HEADER_SIZE] = 3;
        let checksum = DoubleSha256.checksum(&frame[HEADER_SIZE..]);
        frame[20..24].copy_from_slice(&checksum);

        match codec.decode(&frame, &caps).unwrap_err() {
            WireError::Payload { command, source } => {
                assert_eq!(command, "inv");
                match *source {
                    WireError::UnexpectedEof { offset, .. } => {
                        assert_eq!(offset, HEADER_SIZE + 1 + 64)
                    }
                    other => unreachable!("unexpected {other:?}"),
                }
            }
            other => unreachable!("unexpected {other:?}"),
        }
    }

    #[test]
    fn read_message_from_blocking_source() {
        let codec = Codec::default();
        let caps = Capabilities::latest();
        let frame = codec.encode(&Message::Pong { nonce: 9 }, &caps).unwrap();

        let mut cursor = Cursor::new(frame.clone());
        assert_eq!(
            codec.read_message(&mut cursor, &caps).unwrap(),
            Message::Pong { nonce: 9 }
        );
        assert!(matches!(
            codec.read_message(&mut cursor, &caps),
            Err(WireError::ConnectionClosed)
        ));

        let mut short = Cursor::new(frame[..frame.len() - 2].to_vec());
        assert!(matches!(
            codec.read_message(&mut short, &caps),
            Err(WireError::UnexpectedEof { field: "payload", .. })
        ));
    }

    #[test]
    fn write_message_reports_sink_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = Codec::default()
            .write_message(&mut Broken, &Message::Verack, &Capabilities::latest())
            .unwrap_err();
        match err {
            WireError::WriteError { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::BrokenPipe)
            }
            other => unreachable!("unexpected {other:?}"),
        }
    }
}

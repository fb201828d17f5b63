//! Stream framing for one connection.
//!
//! [`MessageCodec`] plugs the stateless [`Codec`] into
//! `tokio_util::codec::Framed`. It buffers partial input and tracks where
//! the connection is inside the current frame:
//!
//! ```text
//! Idle -> HeaderRead -> PayloadRead -> Dispatched -> Idle
//!            |              |
//!            +--------------+--> Rejected (terminal)
//! ```
//!
//! A fatal decode error leaves the stream at an unknown position, so the
//! codec refuses all further input with `ConnectionRejected`. It never
//! skips bytes looking for the next magic.

use crate::core::command::Command;
use crate::core::envelope::{MessageEnvelope, HEADER_SIZE};
use crate::error::{Result, WireError};
use crate::protocol::codec::Codec;
use crate::protocol::message::Message;
use crate::protocol::version::Capabilities;
use crate::utils::metrics::global_metrics;
use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

/// Where a connection's decoder is inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    /// Nothing buffered for the next frame
    Idle,
    /// Some header bytes buffered, fewer than 24
    HeaderRead,
    /// Header accepted, waiting for the payload; `caps` are the
    /// capabilities the header was checked under
    PayloadRead {
        envelope: MessageEnvelope,
        command: Command,
        caps: Capabilities,
    },
    /// Last frame handed out; the next call starts over
    Dispatched,
    /// A fatal error occurred; terminal
    Rejected,
}

/// Per-connection `Decoder` / `Encoder` for protocol messages.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    codec: Codec,
    caps: Capabilities,
    state: CodecState,
}

impl MessageCodec {
    pub fn new(codec: Codec, caps: Capabilities) -> Self {
        Self {
            codec,
            caps,
            state: CodecState::Idle,
        }
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    pub fn is_rejected(&self) -> bool {
        self.state == CodecState::Rejected
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Switch to the capabilities negotiated by the handshake.
    ///
    /// Takes effect from the next frame; a frame already in flight is
    /// decoded with the capabilities its header was accepted under.
    pub fn set_capabilities(&mut self, caps: Capabilities) {
        debug!(version = %caps.version(), "capabilities updated");
        self.caps = caps;
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    fn reject(&mut self, err: WireError) -> WireError {
        global_metrics().decode_error(&err);
        if err.is_fatal() {
            debug!(kind = err.kind(), "framing rejected");
            self.state = CodecState::Rejected;
        }
        err
    }

    fn read_header(&mut self, src: &BytesMut) -> Result<Option<(MessageEnvelope, Command)>> {
        if src.is_empty() {
            self.state = CodecState::Idle;
            return Ok(None);
        }
        if src.len() < HEADER_SIZE {
            self.state = CodecState::HeaderRead;
            return Ok(None);
        }

        let (envelope, spec) = self.codec.decode_header(&src[..HEADER_SIZE], &self.caps)?;
        Ok(Some((envelope, spec.command)))
    }

    fn decode_frame(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        let (envelope, command, caps) = match self.state {
            CodecState::Rejected => return Err(WireError::ConnectionRejected),
            CodecState::PayloadRead {
                envelope,
                command,
                caps,
            } => (envelope, command, caps),
            CodecState::Idle | CodecState::HeaderRead | CodecState::Dispatched => {
                match self.read_header(src)? {
                    Some((envelope, command)) => (envelope, command, self.caps),
                    None => return Ok(None),
                }
            }
        };
        self.state = CodecState::PayloadRead {
            envelope,
            command,
            caps,
        };

        let frame_len = HEADER_SIZE + envelope.payload_len();
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let payload = src.split_to(envelope.payload_len());

        let spec = self.codec.registry().lookup(command)?;
        let msg = self
            .codec
            .decode_payload(&envelope, spec, &payload, &caps)?;

        trace!(%command, len = frame_len, "frame dispatched");
        global_metrics().message_decoded(frame_len);
        self.state = CodecState::Dispatched;
        Ok(Some(msg))
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        self.decode_frame(src).map_err(|err| self.reject(err))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if let Some(msg) = self.decode(src)? {
            return Ok(Some(msg));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let err = match self.state {
            CodecState::PayloadRead { envelope, .. } => WireError::UnexpectedEof {
                field: "payload",
                offset: HEADER_SIZE,
                needed: envelope.payload_len(),
                available: src.len() - HEADER_SIZE,
            },
            _ => WireError::UnexpectedEof {
                field: "header",
                offset: 0,
                needed: HEADER_SIZE,
                available: src.len(),
            },
        };
        Err(self.reject(err))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = WireError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let frame = self.codec.encode(&msg, &self.caps)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}

use crate::config::CodecConfig;
use crate::error::{Result, WireError};
use crate::protocol::codec::Codec;
use crate::protocol::framing::{CodecState, MessageCodec};
use crate::protocol::message::Message;
use crate::protocol::version::Capabilities;
use crate::utils::metrics::global_metrics;
use crate::utils::timeout::{with_deadline, DEFAULT_TIMEOUT};

use futures::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// A framed peer connection with bounded send and receive.
///
/// Every `send`/`recv` gives up with `Timeout` when its deadline passes
/// and with `Cancelled` as soon as the connection's token fires.
pub struct WireStream<S> {
    framed: Framed<S, MessageCodec>,
    send_timeout: Duration,
    recv_timeout: Duration,
    cancel: CancellationToken,
    last_activity: Instant,
}

impl<S> WireStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: S, codec: Codec, caps: Capabilities) -> Self {
        Self {
            framed: Framed::new(io, MessageCodec::new(codec, caps)),
            send_timeout: DEFAULT_TIMEOUT,
            recv_timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
            last_activity: Instant::now(),
        }
    }

    /// Stream configured from `config`, starting at its protocol version
    pub fn from_config(io: S, config: &CodecConfig) -> Self {
        Self::new(
            io,
            Codec::from_config(config),
            Capabilities::for_version(config.protocol_version),
        )
        .with_timeouts(config.write_timeout, config.read_timeout)
    }

    /// Set custom timeout durations
    pub fn with_timeouts(mut self, send_timeout: Duration, recv_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self.recv_timeout = recv_timeout;
        self
    }

    /// Tie the stream to an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this stream's pending and future operations
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.framed.codec().capabilities()
    }

    /// Apply the capabilities negotiated during the handshake.
    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.framed.codec_mut().set_capabilities(caps);
    }

    pub fn state(&self) -> CodecState {
        self.framed.codec().state()
    }

    /// Get the time since the last activity (send or receive)
    pub fn time_since_last_activity(&self) -> Duration {
        self.last_activity.elapsed()
    }

    fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    #[instrument(skip(self, msg), fields(command = %msg.command()), level = "debug")]
    pub async fn send(&mut self, msg: Message) -> Result<()> {
        debug!(timeout_ms = ?self.send_timeout.as_millis(), "Sending message with timeout");

        let framed = &mut self.framed;
        with_deadline(
            async {
                framed.send(msg).await?;
                Ok(())
            },
            self.send_timeout,
            &self.cancel,
        )
        .await
        .inspect_err(record_wait_error)?;

        self.update_activity();
        Ok(())
    }

    /// Receive the next message.
    ///
    /// A peer that closes between frames yields `ConnectionClosed`; one
    /// that closes mid-frame yields `UnexpectedEof`. After a fatal decode
    /// error every call yields `ConnectionRejected`.
    #[instrument(skip(self), level = "debug")]
    pub async fn recv(&mut self) -> Result<Message> {
        if self.framed.codec().is_rejected() {
            return Err(WireError::ConnectionRejected);
        }
        debug!(timeout_ms = ?self.recv_timeout.as_millis(), "Receiving message with timeout");

        let framed = &mut self.framed;
        let msg = with_deadline(
            async {
                let msg = framed.next().await.ok_or(WireError::ConnectionClosed)??;
                Ok(msg)
            },
            self.recv_timeout,
            &self.cancel,
        )
        .await
        .inspect_err(record_wait_error)?;

        self.update_activity();
        Ok(msg)
    }

    /// Flush and shut down the write half.
    pub async fn close(&mut self) -> Result<()> {
        let framed = &mut self.framed;
        with_deadline(
            async {
                framed.close().await?;
                Ok(())
            },
            self.send_timeout,
            &self.cancel,
        )
        .await
    }

    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

fn record_wait_error(err: &WireError) {
    match err {
        WireError::Timeout(_) => global_metrics().timeout(),
        WireError::Cancelled => global_metrics().cancelled(),
        _ => {}
    }
}

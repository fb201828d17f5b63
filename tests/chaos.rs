//! Chaos tests
//!
//! Stalled peers, dropped connections, byte-at-a-time delivery and
//! corrupted frames over an in-memory duplex pipe.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use p2p_wire::core::hash::ContentHash;
use p2p_wire::core::inventory::InventoryVector;
use p2p_wire::protocol::framing::CodecState;
use p2p_wire::service::WireStream;
use p2p_wire::{Capabilities, Codec, Message, Network, WireError};
use std::time::Duration;
use tokio::io::{duplex, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

fn codec() -> Codec {
    Codec::new(Network::Regtest)
}

fn inv(n: u8) -> Message {
    Message::Inv(
        (0..n)
            .map(|i| InventoryVector::new(ContentHash::double_sha256(&[i])))
            .collect(),
    )
}

#[tokio::test]
async fn test_send_and_receive_over_duplex() {
    let (a, b) = duplex(1024);
    let mut left = WireStream::new(a, codec(), Capabilities::latest());
    let mut right = WireStream::new(b, codec(), Capabilities::latest());

    left.send(inv(3)).await.unwrap();
    left.send(Message::Pong { nonce: 5 }).await.unwrap();

    assert_eq!(right.recv().await.unwrap(), inv(3));
    assert_eq!(right.recv().await.unwrap(), Message::Pong { nonce: 5 });
    assert_eq!(right.state(), CodecState::Dispatched);
}

#[tokio::test(start_paused = true)]
async fn test_recv_times_out_on_silent_peer() {
    let (a, _b) = duplex(1024);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest())
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(250));

    match stream.recv().await {
        Err(WireError::Timeout(d)) => assert_eq!(d, Duration::from_millis(250)),
        other => unreachable!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_recv_times_out_mid_frame() {
    let (a, mut b) = duplex(1024);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest())
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(100));

    let frame = codec().encode(&inv(2), &Capabilities::latest()).unwrap();
    b.write_all(&frame[..30]).await.unwrap();

    assert!(matches!(stream.recv().await, Err(WireError::Timeout(_))));
    assert!(matches!(stream.state(), CodecState::PayloadRead { .. }));

    // The rest arrives late; the partial frame was kept.
    b.write_all(&frame[30..]).await.unwrap();
    assert_eq!(stream.recv().await.unwrap(), inv(2));
}

#[tokio::test]
async fn test_send_times_out_when_peer_stops_reading() {
    let (a, _b) = duplex(64);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest())
        .with_timeouts(Duration::from_millis(50), Duration::from_secs(1));

    // Far more than the pipe buffers; nobody drains the other end.
    let result = stream.send(inv(200)).await;
    assert!(matches!(result, Err(WireError::Timeout(_))));
}

#[tokio::test]
async fn test_cancellation_interrupts_recv() {
    let (a, _b) = duplex(1024);
    let token = CancellationToken::new();
    let mut stream = WireStream::new(a, codec(), Capabilities::latest())
        .with_timeouts(Duration::from_secs(60), Duration::from_secs(60))
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    assert!(matches!(stream.recv().await, Err(WireError::Cancelled)));
    canceller.await.unwrap();

    // Once cancelled, every later call fails fast.
    assert!(matches!(
        stream.send(Message::Verack).await,
        Err(WireError::Cancelled)
    ));
}

#[tokio::test]
async fn test_clean_close_between_frames() {
    let (a, b) = duplex(1024);
    let mut left = WireStream::new(a, codec(), Capabilities::latest());
    let mut right = WireStream::new(b, codec(), Capabilities::latest());

    left.send(Message::Verack).await.unwrap();
    drop(left);

    assert_eq!(right.recv().await.unwrap(), Message::Verack);
    assert!(matches!(right.recv().await, Err(WireError::ConnectionClosed)));
}

#[tokio::test]
async fn test_close_mid_frame_is_unexpected_eof() {
    let (a, mut b) = duplex(1024);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest());

    let frame = codec().encode(&inv(1), &Capabilities::latest()).unwrap();
    b.write_all(&frame[..frame.len() - 4]).await.unwrap();
    drop(b);

    assert!(matches!(
        stream.recv().await,
        Err(WireError::UnexpectedEof { field: "payload", .. })
    ));
}

#[tokio::test]
async fn test_byte_at_a_time_delivery() {
    let (a, mut b) = duplex(1024);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest());

    let mut wire = codec().encode(&inv(4), &Capabilities::latest()).unwrap();
    wire.extend(codec().encode(&Message::GetAddr, &Capabilities::latest()).unwrap());

    let writer = tokio::spawn(async move {
        for byte in wire {
            b.write_all(&[byte]).await.unwrap();
            tokio::task::yield_now().await;
        }
        b
    });

    assert_eq!(stream.recv().await.unwrap(), inv(4));
    assert_eq!(stream.recv().await.unwrap(), Message::GetAddr);
    writer.await.unwrap();
}

#[tokio::test]
async fn test_corrupted_frame_rejects_connection() {
    let (a, mut b) = duplex(1024);
    let mut stream = WireStream::new(a, codec(), Capabilities::latest());

    let mut frame = codec().encode(&inv(1), &Capabilities::latest()).unwrap();
    let last = frame.len() - 1;
    frame[last] ^= 0xff;
    b.write_all(&frame).await.unwrap();
    b.write_all(&codec().encode(&Message::Verack, &Capabilities::latest()).unwrap())
        .await
        .unwrap();

    assert!(matches!(
        stream.recv().await,
        Err(WireError::ChecksumMismatch { .. })
    ));
    assert_eq!(stream.state(), CodecState::Rejected);
    // The valid verack behind the bad frame is never surfaced.
    for _ in 0..2 {
        let err = stream.recv().await.unwrap_err();
        assert!(matches!(err, WireError::ConnectionRejected));
        assert!(err.is_fatal());
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1 — cold start with no hardware and no model (§8): `aurad` must
//! still come up in fallback mode and broadcast full-size frames within
//! a second, rather than waiting on a missing accelerator.

use std::time::Duration;

use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::prelude::*;

#[tokio::test]
async fn cold_start_broadcasts_full_size_fallback_frames() {
    let fixture = Fixture::new();
    let config_path = fixture.write_config(
        "model_path = \"/nonexistent/model.bin\"\n\
         particle_count = 10000\n\
         target_fps = 60\n",
    );
    let bind = test_bind(10);
    let _aurad = Aurad::spawn(&config_path, bind, &[]);

    let connected = wait_until(Duration::from_secs(5), || std::net::TcpStream::connect(bind).is_ok());
    assert!(connected, "aurad never opened its broadcast socket");

    let url = format!("ws://{bind}/");
    let (mut ws, _response) = tokio::time::timeout(Duration::from_secs(5), tokio_tungstenite::connect_async(&url))
        .await
        .expect("timed out connecting to broadcast socket")
        .expect("failed to open websocket connection");

    let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for first frame")
        .expect("connection closed before a frame arrived")
        .expect("websocket read error");

    let bytes = match message {
        Message::Binary(bytes) => bytes,
        other => panic!("expected a binary particle frame, got {other:?}"),
    };

    assert_eq!(&bytes[0..4], &aura_wire::frame::FRAME_MAGIC.to_le_bytes());
    assert_eq!(&bytes[4..6], &aura_wire::frame::FRAME_VERSION.to_le_bytes());
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 10_000);
    assert_eq!(bytes.len() - 8, 120_000);

    let frame = aura_wire::frame::decode_frame(&bytes).expect("frame failed to decode");
    assert!(frame.is_finite(), "fallback frame must never contain NaN/inf positions");
}

/// Heartbeat must appear quickly too — it's written by a task that
/// starts alongside the visualization loop, not after it.
#[tokio::test]
async fn cold_start_writes_a_heartbeat_within_a_few_seconds() {
    let fixture = Fixture::new();
    let config_path = fixture.write_config("model_path = \"/nonexistent/model.bin\"\n");
    let bind = test_bind(11);
    let _aurad = Aurad::spawn(&config_path, bind, &[]);

    let heartbeat_path = fixture.heartbeat_path();
    let appeared = wait_until(Duration::from_secs(5), || read_heartbeat_epoch_ms(&heartbeat_path).is_some());
    assert!(appeared, "heartbeat file never appeared");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket fan-out of particle frames and state-update messages — §4.10.
//!
//! Each client's outgoing queue must drop its *oldest* frame on overflow
//! and keep the newest, which a plain bounded `mpsc::Sender` can't do (it
//! can only reject a new item) — so each client gets a tiny
//! `parking_lot::Mutex<VecDeque<Frame>>` capped at 2, paired with a
//! `Notify`, instead.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::loop_::FrameSink;

/// Default bind address for the broadcast server — §4.10.
pub const DEFAULT_BIND: &str = "0.0.0.0:8765";

/// Per-client outgoing queue depth. A full queue drops its oldest entry
/// rather than the newest (§4.10).
const CLIENT_QUEUE_CAPACITY: usize = 2;

struct ClientQueue {
    frames: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl ClientQueue {
    fn new() -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(CLIENT_QUEUE_CAPACITY)),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, bytes: Vec<u8>) {
        let mut frames = self.frames.lock();
        if frames.len() == CLIENT_QUEUE_CAPACITY {
            frames.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        frames.push_back(bytes);
        drop(frames);
        self.notify.notify_one();
    }

    async fn pop(&self) -> Vec<u8> {
        loop {
            if let Some(bytes) = self.frames.lock().pop_front() {
                return bytes;
            }
            self.notify.notified().await;
        }
    }

    fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

pub type ClientId = u64;

/// Fans out encoded particle frames to every connected WebSocket client.
///
/// Cloning shares the same client table; construct once per process and
/// hand clones to the visualization loop (as a [`FrameSink`]) and to the
/// axum router.
#[derive(Clone)]
pub struct BroadcastSink {
    clients: Arc<Mutex<std::collections::HashMap<ClientId, Arc<ClientQueue>>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self { clients: Arc::new(Mutex::new(std::collections::HashMap::new())), next_id: Arc::new(AtomicU64::new(0)) }
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Number of frames dropped for `client_id` because its outgoing
    /// queue was full — the metric backing S5's "dropped-frame counter
    /// for that client grows at ~50/s" observable. Returns `None` if the
    /// client is no longer connected.
    pub fn dropped_frames(&self, client_id: ClientId) -> Option<u64> {
        self.clients.lock().get(&client_id).map(|queue| queue.dropped_count())
    }

    fn add_client(&self) -> (ClientId, Arc<ClientQueue>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(ClientQueue::new());
        self.clients.lock().insert(id, queue.clone());
        (id, queue)
    }

    fn remove_client(&self, id: ClientId) {
        self.clients.lock().remove(&id);
    }

    /// Build the axum router serving the `/` WebSocket upgrade endpoint.
    pub fn router(self) -> Router {
        Router::new().route("/", get(upgrade_handler)).with_state(self)
    }

    /// Bind and serve forever (or until the process exits) — the
    /// top-level entry point `aura-companion` wires into its own tokio
    /// runtime.
    pub async fn serve(self, bind: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind).await?;
        axum::serve(listener, self.router()).await
    }
}

impl FrameSink for BroadcastSink {
    /// Fire-and-forget: encodes once and hands the bytes to every
    /// connected client's queue. Never blocks on a slow client (§4.9,
    /// §4.10) — a client snapshot is copied out of the registry lock
    /// before any queueing happens, so I/O for one client never holds up
    /// another (§5).
    fn publish(&self, positions: &[[f32; 3]], seq: u64, generated_at_epoch_ms: u64) {
        let frame = aura_core::ParticleFrame { positions: positions.to_vec(), seq, generated_at_epoch_ms };
        let bytes = aura_wire::frame::encode_frame(&frame);
        let clients: Vec<Arc<ClientQueue>> = self.clients.lock().values().cloned().collect();
        for client in clients {
            client.push(bytes.clone());
        }
    }
}

async fn upgrade_handler(ws: WebSocketUpgrade, State(sink): State<BroadcastSink>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, sink))
}

async fn handle_socket(mut socket: WebSocket, sink: BroadcastSink) {
    let (id, queue) = sink.add_client();
    debug!(client_id = id, "broadcast client connected");
    loop {
        tokio::select! {
            bytes = queue.pop() => {
                if socket.send(Message::Binary(bytes.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(client_id = id, error = %err, "broadcast client read error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    sink.remove_client(id);
    debug!(client_id = id, "broadcast client disconnected");
}

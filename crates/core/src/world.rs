// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared, snapshotable world state.
//!
//! A single [`WorldState`] instance is created once at process start and
//! lives for the life of the process. Sensor daemons write into it under a
//! hierarchical dotted key path (`"environment.temperature"`,
//! `"vision.detected_objects"`); the visualization loop is the only reader
//! that matters on the hot path, and it only ever reads through
//! [`WorldState::get_snapshot`] — never per-key, never mid-frame.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::clock::Clock;

/// Above this, a snapshot is logged as a budget violation rather than
/// silently tolerated — see §4.1: "must complete in ≤0.5 ms".
const SNAPSHOT_BUDGET: Duration = Duration::from_micros(500);

/// A value stored under a WorldState key.
///
/// Deliberately NOT an open/duck-typed payload — every sensor daemon must
/// commit to one of these shapes up front, and a daemon that tries to
/// change a key's shape gets rejected rather than silently reinterpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// A small fixed-shape numeric buffer (e.g. an IMU accel/gyro triple).
    Buffer(Vec<f32>),
}

impl Value {
    /// Discriminant used to detect a type-changing write. Two values of
    /// different shape never compare equal here, even if one is e.g. an
    /// empty list and the other an empty map.
    fn shape(&self) -> ValueShape {
        match self {
            Value::Number(_) => ValueShape::Number,
            Value::Bool(_) => ValueShape::Bool,
            Value::Text(_) => ValueShape::Text,
            Value::List(_) => ValueShape::List,
            Value::Map(_) => ValueShape::Map,
            Value::Buffer(_) => ValueShape::Buffer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    Number,
    Bool,
    Text,
    List,
    Map,
    Buffer,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Value,
    written_at: Instant,
    written_at_epoch_ms: u64,
    ttl: Option<Duration>,
}

impl StoredValue {
    fn is_stale(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.written_at) > ttl,
            None => false,
        }
    }
}

/// A fully owned, immutable deep copy of WorldState at one instant.
///
/// This is the *only* interface the visualization loop reads through; it
/// never takes per-key reads mid-frame, so a snapshot's internal
/// consistency is all that matters for frame determinism.
#[derive(Debug, Clone)]
pub struct WorldSnapshot {
    map: HashMap<String, Value>,
    pub taken_at: Instant,
}

impl WorldSnapshot {
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.map.get(path)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }
}

/// Process-wide mapping from hierarchical key path to typed value.
///
/// Concurrency: one [`parking_lot::RwLock`] guards the whole map. Readers
/// never block writers for more than one copy cycle because the only bulk
/// read is [`get_snapshot`](Self::get_snapshot), which clones out from
/// under a read guard rather than holding the lock during any I/O.
pub struct WorldState {
    inner: RwLock<HashMap<String, StoredValue>>,
    clock: Arc<dyn Clock>,
}

impl WorldState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { inner: RwLock::new(HashMap::new()), clock }
    }

    /// Write a value under `path`, rejecting type-changing writes.
    ///
    /// A daemon that sends a shape different from what's already stored
    /// gets a logged error and the previous value is left intact — this is
    /// the only corruption-handling the world state does; it never trusts
    /// late writers to "fix" a key's type.
    pub fn update(&self, path: &str, value: Value) {
        self.update_with_ttl(path, value, None)
    }

    pub fn update_with_ttl(&self, path: &str, value: Value, ttl: Option<Duration>) {
        let now = self.clock.now();
        let now_epoch_ms = self.clock.epoch_ms();
        let mut guard = self.inner.write();
        if let Some(existing) = guard.get(path) {
            if !existing.is_stale(now) && existing.value.shape() != value.shape() {
                warn!(
                    key = path,
                    expected = ?existing.value.shape(),
                    got = ?value.shape(),
                    "rejected type-changing WorldState write"
                );
                return;
            }
        }
        guard.insert(
            path.to_string(),
            StoredValue { value, written_at: now, written_at_epoch_ms: now_epoch_ms, ttl },
        );
    }

    /// Read a single key. Returns `None` if the key was never written, or
    /// if its TTL has elapsed — unknown keys read as absent, never as a
    /// default value.
    pub fn get(&self, path: &str) -> Option<Value> {
        let now = self.clock.now();
        let guard = self.inner.read();
        let stored = guard.get(path)?;
        if stored.is_stale(now) {
            return None;
        }
        Some(stored.value.clone())
    }

    /// Returns the epoch-millisecond timestamp of the last write to `path`,
    /// regardless of staleness.
    pub fn written_at_epoch_ms(&self, path: &str) -> Option<u64> {
        self.inner.read().get(path).map(|s| s.written_at_epoch_ms)
    }

    /// Deep-copies every live (non-stale) key into an owned snapshot.
    ///
    /// Must complete within [`SNAPSHOT_BUDGET`] for the frame's worth of
    /// live data; a debug build logs a warning if it doesn't, but the
    /// result is always returned — this is an observability signal, not an
    /// enforced cap.
    pub fn get_snapshot(&self) -> WorldSnapshot {
        let start = self.clock.now();
        let guard = self.inner.read();
        let map = guard
            .iter()
            .filter(|(_, v)| !v.is_stale(start))
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect();
        drop(guard);
        let elapsed = self.clock.now().saturating_duration_since(start);
        if elapsed > SNAPSHOT_BUDGET {
            debug!(elapsed_us = elapsed.as_micros(), "world state snapshot exceeded budget");
        }
        WorldSnapshot { map, taken_at: start }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::sync::Arc;

    fn fixture() -> (WorldState, Arc<FakeClock>) {
        let clock = Arc::new(FakeClock::new());
        (WorldState::new(clock.clone()), clock)
    }

    #[test]
    fn unknown_key_reads_as_absent() {
        let (ws, _clock) = fixture();
        assert!(ws.get("nope").is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let (ws, _clock) = fixture();
        ws.update("environment.temperature", Value::Number(21.0));
        assert_eq!(ws.get("environment.temperature"), Some(Value::Number(21.0)));
    }

    #[test]
    fn type_changing_write_is_rejected_keeping_old_value() {
        let (ws, _clock) = fixture();
        ws.update("wifi.networks", Value::List(vec![]));
        ws.update("wifi.networks", Value::Number(1.0));
        assert_eq!(ws.get("wifi.networks"), Some(Value::List(vec![])));
    }

    #[test]
    fn ttl_expiry_makes_key_read_as_absent() {
        let (ws, clock) = fixture();
        ws.update_with_ttl("bluetooth.devices", Value::List(vec![]), Some(Duration::from_secs(15)));
        assert!(ws.get("bluetooth.devices").is_some());
        clock.advance(Duration::from_secs(16));
        assert!(ws.get("bluetooth.devices").is_none());
    }

    #[test]
    fn snapshot_excludes_stale_keys_and_is_independent_of_later_writes() {
        let (ws, clock) = fixture();
        ws.update_with_ttl("a", Value::Number(1.0), Some(Duration::from_secs(1)));
        ws.update("b", Value::Number(2.0));
        let snap = ws.get_snapshot();
        assert_eq!(snap.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(snap.get("b"), Some(&Value::Number(2.0)));

        ws.update("b", Value::Number(3.0));
        clock.advance(Duration::from_secs(2));
        assert_eq!(snap.get("b"), Some(&Value::Number(2.0)));
        assert!(ws.get("a").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_writers_never_produce_a_torn_snapshot() {
        let clock = Arc::new(crate::clock::SystemClock);
        let ws = Arc::new(WorldState::new(clock));

        let mut writers = Vec::new();
        for t in 0..8u32 {
            let ws = ws.clone();
            writers.push(tokio::spawn(async move {
                for i in 0..1000u32 {
                    ws.update(&format!("writer.{t}"), Value::Number(f64::from(i)));
                }
            }));
        }

        let ws_reader = ws.clone();
        let reader = tokio::spawn(async move {
            for _ in 0..1000 {
                let snap = ws_reader.get_snapshot();
                for (_, v) in snap.iter() {
                    match v {
                        Value::Number(n) => assert!(*n >= 0.0 && *n < 1000.0),
                        other => panic!("unexpected value in snapshot: {other:?}"),
                    }
                }
            }
        });

        for w in writers {
            w.await.unwrap();
        }
        reader.await.unwrap();
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The uniform daemon lifecycle contract — §4.3.
//!
//! Every sensor daemon implements [`Daemon`]; the manager (`crate::manager`)
//! is the only thing that constructs, runs, and restarts one. A daemon
//! never calls another daemon directly — the only shared surfaces are
//! [`DaemonCtx`]'s `world` and `events` handles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Category, Clock, DaemonId, Event, EventKind, Priority, WorldState};
use aura_eventbus::EventBus;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::DaemonError;

/// Ceiling for any single blocking probe a daemon performs during
/// `initialize` — §4.3: "any blocking probe ... uses a 2s timeout,
/// single attempt; retries are the manager's responsibility."
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Ceiling `stop()` is raced against by the manager — §4.3: "`stop()`
/// returns within 3s."
pub const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared handles every daemon needs, passed by value into `run`.
#[derive(Clone)]
pub struct DaemonCtx {
    pub world: Arc<WorldState>,
    pub events: EventBus,
    pub clock: Arc<dyn Clock>,
    pub cancel: CancellationToken,
}

impl DaemonCtx {
    pub fn new(world: Arc<WorldState>, events: EventBus, clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        Self { world, events, clock, cancel }
    }

    /// Publish a lifecycle event for `source` under `category`, stamped
    /// with the ctx's clock — the one mandatory publish point every
    /// daemon passes through on every state transition (§4.3).
    pub fn publish_lifecycle(&self, category: &Category, source: DaemonId, kind: EventKind) {
        let priority = match kind {
            EventKind::InitFailed | EventKind::RestartExhausted => Priority::High,
            EventKind::Degraded => Priority::Normal,
            _ => Priority::Normal,
        };
        let at_epoch_ms = self.clock.epoch_ms();
        self.events.publish(Event::new(category.clone(), kind, priority, source, at_epoch_ms));
    }
}

/// Uniform lifecycle contract for a long-running sensor daemon.
///
/// `run` is the cooperative loop: it must poll `ctx.cancel` (or select
/// over it) and return promptly once cancellation is requested, rather
/// than relying solely on `stop`. `stop` exists for daemons that hold a
/// resource (an open serial port, a subprocess handle) that needs
/// explicit teardown beyond dropping the cancellation token.
#[async_trait]
pub trait Daemon: Send {
    fn id(&self) -> DaemonId;
    fn category(&self) -> &Category;

    /// One-time setup. A fast-fail probe belongs here, wrapped in
    /// [`probe_with_timeout`]. Returning `Err` means the manager will
    /// not call `run` at all for this instance.
    async fn initialize(&mut self, ctx: &DaemonCtx) -> Result<(), DaemonError>;

    /// The cooperative loop. Returns `Ok(())` on cooperative shutdown
    /// (cancellation observed), `Err` on an unrecoverable failure the
    /// manager should apply `RestartPolicy` to.
    async fn run(&mut self, ctx: DaemonCtx) -> Result<(), DaemonError>;

    /// Release any held resources (serial ports, sockets). The manager
    /// races this against [`STOP_TIMEOUT`] and abandons the daemon if it
    /// doesn't return in time.
    async fn stop(&mut self);
}

/// Wraps any blocking probe future in a single 2s timeout, with no
/// internal retry — §4.3's fast-fail contract. The manager, not the
/// probe, decides whether to try again.
pub async fn probe_with_timeout<F, T>(fut: F) -> Result<T, DaemonError>
where
    F: Future<Output = Result<T, DaemonError>>,
{
    match tokio::time::timeout(PROBE_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_s = PROBE_TIMEOUT.as_secs(), "daemon probe timed out");
            Err(DaemonError::ProbeTimeout(PROBE_TIMEOUT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_support::world_state_with_fake_clock;

    fn ctx() -> DaemonCtx {
        let (world, clock) = world_state_with_fake_clock();
        DaemonCtx::new(Arc::new(world), EventBus::new(), clock, CancellationToken::new())
    }

    #[tokio::test]
    async fn probe_with_timeout_passes_through_fast_success() {
        let result = probe_with_timeout(async { Ok::<_, DaemonError>(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_with_timeout_surfaces_probe_timeout_error() {
        let handle = tokio::spawn(probe_with_timeout(async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, DaemonError>(())
        }));
        tokio::time::advance(PROBE_TIMEOUT + Duration::from_millis(1)).await;
        let result = handle.await.unwrap();
        assert_eq!(result, Err(DaemonError::ProbeTimeout(PROBE_TIMEOUT)));
    }

    #[tokio::test]
    async fn publish_lifecycle_enqueues_an_event_subscribers_receive() {
        let ctx = ctx();
        let mut sub = ctx.events.subscribe(None, Priority::Low);
        ctx.publish_lifecycle(&Category::new("wifi"), DaemonId::new(), EventKind::Running);
        let event = sub.receiver.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::Running);
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AdaptiveDaemonManager` — §4.5.
//!
//! On startup, runs hardware discovery, instantiates the matching
//! daemon for each discovered capability, and owns supervision:
//! listening for daemon failure and applying each daemon's
//! [`RestartPolicy`]. It is the only component that creates daemons
//! (§4.5 invariant) — sensor modules never construct themselves.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aura_core::{Capability, Category, Clock, DaemonId, EventKind, RestartPolicy, WorldState};
use aura_eventbus::EventBus;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::base::{Daemon, DaemonCtx, STOP_TIMEOUT};

/// Window over which `RestartPolicy::OnFailure(k)` counts failures —
/// §4.3: "restarts up to k times in a rolling 10-minute window."
const RESTART_WINDOW: Duration = Duration::from_secs(600);

/// One device hardware discovery found.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredDevice {
    pub capability: Capability,
    pub device_path: PathBuf,
}

/// Seam standing in for real USB/I2C/PCIe/audio bus enumeration (§4.5).
pub trait HardwareDiscovery: Send {
    fn discover(&mut self) -> Vec<DiscoveredDevice>;
}

type DaemonFactory = Arc<dyn Fn() -> Box<dyn Daemon> + Send + Sync>;

struct Registration {
    category: Category,
    restart_policy: RestartPolicy,
    factory: DaemonFactory,
}

struct FailureWindow {
    timestamps: VecDeque<Instant>,
}

impl FailureWindow {
    fn new() -> Self {
        Self { timestamps: VecDeque::new() }
    }

    /// Record a failure now and return the count still inside the
    /// rolling window.
    fn record(&mut self, now: Instant) -> usize {
        self.timestamps.push_back(now);
        while let Some(&front) = self.timestamps.front() {
            if now.saturating_duration_since(front) > RESTART_WINDOW {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.len()
    }
}

struct SupervisedHandle {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Hardware discovery → daemon instantiation & supervision, per §4.5.
///
/// Internally single-threaded: `discover_and_spawn` and the failure
/// handling it triggers only ever run from the manager's own task; the
/// daemons it spawns run on their own tasks and only ever touch the
/// manager through the event bus.
pub struct AdaptiveDaemonManager {
    world: Arc<WorldState>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    registrations: HashMap<Capability, Registration>,
    instantiated: Mutex<HashSet<(Category, PathBuf)>>,
    running: Mutex<HashMap<(Category, PathBuf), SupervisedHandle>>,
}

impl AdaptiveDaemonManager {
    pub fn new(world: Arc<WorldState>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            world,
            events,
            clock,
            registrations: HashMap::new(),
            instantiated: Mutex::new(HashSet::new()),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Register the daemon factory responsible for `capability`. Must
    /// be called before [`discover_and_spawn`]; capabilities with no
    /// registration are logged and never instantiated (§4.5).
    pub fn register(
        &mut self,
        capability: Capability,
        category: Category,
        restart_policy: RestartPolicy,
        factory: impl Fn() -> Box<dyn Daemon> + Send + Sync + 'static,
    ) {
        self.registrations.insert(capability, Registration { category, restart_policy, factory: Arc::new(factory) });
    }

    /// Run discovery once and spawn any newly discovered, registered,
    /// not-yet-instantiated `(category, device_path)` pair. Returns the
    /// number of daemons spawned this call.
    pub fn discover_and_spawn(&self, discovery: &mut dyn HardwareDiscovery) -> usize {
        let devices = discovery.discover();
        let mut spawned = 0;
        for device in devices {
            let Some(registration) = self.registrations.get(&device.capability) else {
                debug!(capability = ?device.capability, device_path = ?device.device_path, "unknown device capability; not instantiating");
                continue;
            };
            let key = (registration.category.clone(), device.device_path.clone());
            {
                let mut seen = self.instantiated.lock();
                if !seen.insert(key.clone()) {
                    continue; // at most one daemon per (category, device-path) — §4.5 invariant
                }
            }
            self.spawn(key, registration.restart_policy, registration.factory.clone());
            spawned += 1;
        }
        spawned
    }

    fn spawn(&self, key: (Category, PathBuf), restart_policy: RestartPolicy, factory: DaemonFactory) {
        let world = self.world.clone();
        let events = self.events.clone();
        let clock = self.clock.clone();
        let cancel = CancellationToken::new();
        let supervise_cancel = cancel.clone();

        let handle = tokio::spawn(supervise_loop(
            key.clone(),
            world,
            events,
            clock,
            restart_policy,
            factory,
            supervise_cancel,
        ));

        self.running.lock().insert(key, SupervisedHandle { handle, cancel });
    }

    /// Request cooperative shutdown of every supervised daemon, racing
    /// each against [`STOP_TIMEOUT`] — §5 "Shutdown is cooperative."
    pub async fn stop_all(&self) {
        let handles: Vec<_> = {
            let mut running = self.running.lock();
            running.drain().collect()
        };
        for (key, supervised) in handles {
            supervised.cancel.cancel();
            if tokio::time::timeout(STOP_TIMEOUT, supervised.handle).await.is_err() {
                warn!(category = %key.0, device_path = ?key.1, "daemon did not stop within budget; abandoning");
            }
        }
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }
}

async fn supervise_loop(
    key: (Category, PathBuf),
    world: Arc<WorldState>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    restart_policy: RestartPolicy,
    factory: DaemonFactory,
    cancel: CancellationToken,
) {
    let mut failure_window = FailureWindow::new();
    loop {
        let mut daemon = factory();
        let id = daemon.id();
        let ctx = DaemonCtx::new(world.clone(), events.clone(), clock.clone(), cancel.clone());

        if let Err(err) = daemon.initialize(&ctx).await {
            warn!(category = %key.0, device_path = ?key.1, error = %err, "daemon initialize failed");
            ctx.publish_lifecycle(&key.0, id, EventKind::InitFailed);
            if !should_retry(restart_policy, &mut failure_window, clock.as_ref()) {
                return;
            }
            continue;
        }

        let result = daemon.run(ctx.clone()).await;
        daemon.stop().await;

        match result {
            Ok(()) => {
                info!(category = %key.0, device_path = ?key.1, "daemon stopped cleanly");
                return;
            }
            Err(err) => {
                warn!(category = %key.0, device_path = ?key.1, error = %err, "daemon run exited with error");
                if cancel.is_cancelled() {
                    return;
                }
                if !should_retry(restart_policy, &mut failure_window, clock.as_ref()) {
                    ctx.publish_lifecycle(&key.0, id, EventKind::RestartExhausted);
                    return;
                }
            }
        }
    }
}

fn should_retry(policy: RestartPolicy, window: &mut FailureWindow, clock: &dyn Clock) -> bool {
    match policy {
        RestartPolicy::Never => false,
        RestartPolicy::Always => true,
        RestartPolicy::OnFailure(k) => {
            let count = window.record(clock.now());
            count <= k as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_support::world_state_with_fake_clock;
    use aura_core::FakeClock;
    use async_trait::async_trait;

    struct AlwaysFailsDaemon(DaemonId);

    #[async_trait]
    impl Daemon for AlwaysFailsDaemon {
        fn id(&self) -> DaemonId {
            self.0
        }
        fn category(&self) -> &Category {
            static CAT: std::sync::OnceLock<Category> = std::sync::OnceLock::new();
            CAT.get_or_init(|| Category::new("test"))
        }
        async fn initialize(&mut self, _ctx: &DaemonCtx) -> Result<(), crate::error::DaemonError> {
            Ok(())
        }
        async fn run(&mut self, _ctx: DaemonCtx) -> Result<(), crate::error::DaemonError> {
            Err(crate::error::DaemonError::HardwareTransient("boom".to_string()))
        }
        async fn stop(&mut self) {}
    }

    fn manager() -> (AdaptiveDaemonManager, Arc<FakeClock>) {
        let (world, clock) = world_state_with_fake_clock();
        (AdaptiveDaemonManager::new(Arc::new(world), EventBus::new(), clock.clone()), clock)
    }

    struct FakeDiscovery(Vec<DiscoveredDevice>);

    impl HardwareDiscovery for FakeDiscovery {
        fn discover(&mut self) -> Vec<DiscoveredDevice> {
            std::mem::take(&mut self.0)
        }
    }

    #[tokio::test]
    async fn unknown_capability_is_never_instantiated() {
        let (mut manager, _clock) = manager();
        manager.register(
            Capability::WifiAdapter,
            Category::new("wifi"),
            RestartPolicy::Never,
            || Box::new(AlwaysFailsDaemon(DaemonId::new())),
        );
        let mut discovery = FakeDiscovery(vec![DiscoveredDevice {
            capability: Capability::Unknown("mystery".to_string()),
            device_path: PathBuf::from("/dev/mystery0"),
        }]);
        let spawned = manager.discover_and_spawn(&mut discovery);
        assert_eq!(spawned, 0);
        assert_eq!(manager.running_count(), 0);
    }

    #[tokio::test]
    async fn registered_capability_spawns_exactly_one_daemon_per_device() {
        let (mut manager, _clock) = manager();
        manager.register(
            Capability::WifiAdapter,
            Category::new("wifi"),
            RestartPolicy::Never,
            || Box::new(AlwaysFailsDaemon(DaemonId::new())),
        );
        let device = DiscoveredDevice { capability: Capability::WifiAdapter, device_path: PathBuf::from("/dev/wifi0") };
        let mut discovery = FakeDiscovery(vec![device.clone(), device]);
        let spawned = manager.discover_and_spawn(&mut discovery);
        assert_eq!(spawned, 1);
        assert_eq!(manager.running_count(), 1);
        manager.stop_all().await;
    }

    #[tokio::test]
    async fn restart_policy_never_does_not_retry_after_failure() {
        assert!(!should_retry(RestartPolicy::Never, &mut FailureWindow::new(), &FakeClock::new()));
    }

    #[tokio::test]
    async fn restart_policy_on_failure_allows_up_to_k_retries() {
        let clock = FakeClock::new();
        let mut window = FailureWindow::new();
        assert!(should_retry(RestartPolicy::OnFailure(2), &mut window, &clock));
        assert!(should_retry(RestartPolicy::OnFailure(2), &mut window, &clock));
        assert!(!should_retry(RestartPolicy::OnFailure(2), &mut window, &clock));
    }
}

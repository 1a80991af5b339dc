// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wifi` sensor daemon — §4.4: owns `wifi.networks`, polls at ≤10s
//! cadence, publishes `WifiChanged` on a BSSID set difference.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Capability, Category, DaemonId, EventKind, Value, WorldState};
use tracing::info;

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct WifiNetwork {
    pub bssid: String,
    pub ssid: String,
    pub signal_dbm: f64,
    pub band: String,
    pub security: String,
}

/// Seam standing in for a real Wi-Fi scan (`iw`/`nmcli`/platform API) —
/// actual parsing is out of core scope per §1.
pub trait WifiSource: Send {
    fn scan(&mut self) -> Result<Vec<WifiNetwork>, DaemonError>;
}

/// Production default: no Wi-Fi adapter binding is vendored here, so
/// this always reports the adapter absent. A real deployment supplies
/// its own [`WifiSource`] at construction.
#[derive(Default)]
pub struct NoWifiAdapter;

impl WifiSource for NoWifiAdapter {
    fn scan(&mut self) -> Result<Vec<WifiNetwork>, DaemonError> {
        Err(DaemonError::HardwareAbsent("wifi adapter".to_string()))
    }
}

fn network_to_value(n: &WifiNetwork) -> Value {
    let mut map = std::collections::HashMap::new();
    map.insert("bssid".to_string(), Value::Text(n.bssid.clone()));
    map.insert("ssid".to_string(), Value::Text(n.ssid.clone()));
    map.insert("signal_dbm".to_string(), Value::Number(n.signal_dbm));
    map.insert("band".to_string(), Value::Text(n.band.clone()));
    map.insert("security".to_string(), Value::Text(n.security.clone()));
    Value::Map(map)
}

pub struct WifiDaemon<S: WifiSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
    known_bssids: BTreeSet<String>,
}

impl<S: WifiSource> WifiDaemon<S> {
    pub fn new(source: S) -> Self {
        Self {
            id: DaemonId::new(),
            category: Category::new("wifi"),
            source,
            interval: DEFAULT_INTERVAL,
            known_bssids: BTreeSet::new(),
        }
    }

    pub fn required_capabilities() -> Vec<Capability> {
        vec![Capability::WifiAdapter]
    }

    fn apply(&mut self, world: &WorldState, networks: Vec<WifiNetwork>) -> bool {
        let new_bssids: BTreeSet<String> = networks.iter().map(|n| n.bssid.clone()).collect();
        let changed = new_bssids != self.known_bssids;
        let list = Value::List(networks.iter().map(network_to_value).collect());
        world.update("wifi.networks", list);
        world.update(
            "wifi.network_count",
            Value::Number(networks.len() as f64),
        );
        if !networks.is_empty() {
            let best = networks.iter().map(|n| n.signal_dbm).fold(f64::MIN, f64::max);
            let avg = networks.iter().map(|n| n.signal_dbm).sum::<f64>() / networks.len() as f64;
            world.update("wifi.best_signal_dbm", Value::Number(best));
            world.update("wifi.avg_signal_dbm", Value::Number(avg));
            let band_24 = networks.iter().filter(|n| n.band == "2.4GHz").count() as f64 / networks.len() as f64;
            let band_5 = networks.iter().filter(|n| n.band == "5GHz").count() as f64 / networks.len() as f64;
            let secure = networks.iter().filter(|n| n.security != "open").count() as f64 / networks.len() as f64;
            world.update("wifi.band_24ghz_fraction", Value::Number(band_24));
            world.update("wifi.band_5ghz_fraction", Value::Number(band_5));
            world.update("wifi.secure_fraction", Value::Number(secure));
        }
        self.known_bssids = new_bssids;
        changed
    }
}

#[async_trait]
impl<S: WifiSource + Send> Daemon for WifiDaemon<S> {
    fn id(&self) -> DaemonId {
        self.id
    }

    fn category(&self) -> &Category {
        &self.category
    }

    async fn initialize(&mut self, _ctx: &DaemonCtx) -> Result<(), DaemonError> {
        Ok(())
    }

    async fn run(&mut self, ctx: DaemonCtx) -> Result<(), DaemonError> {
        ctx.publish_lifecycle(&self.category, self.id, EventKind::Running);
        loop {
            match self.source.scan() {
                Ok(networks) => {
                    if self.apply(&ctx.world, networks) {
                        info!(daemon = %self.id, "wifi network set changed");
                        ctx.publish_lifecycle(&self.category, self.id, EventKind::WifiChanged);
                    }
                }
                Err(err) => {
                    ctx.publish_lifecycle(&self.category, self.id, EventKind::Degraded);
                    return Err(err);
                }
            }
            if crate::sensors::sleep_or_cancel(self.interval, &ctx.cancel).await {
                break;
            }
        }
        ctx.publish_lifecycle(&self.category, self.id, EventKind::Stopped);
        Ok(())
    }

    async fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_support::world_state_with_fake_clock;
    use aura_eventbus::EventBus;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct FixedSource(Vec<Vec<WifiNetwork>>, usize);

    impl WifiSource for FixedSource {
        fn scan(&mut self) -> Result<Vec<WifiNetwork>, DaemonError> {
            let idx = self.1.min(self.0.len() - 1);
            self.1 += 1;
            Ok(self.0[idx].clone())
        }
    }

    fn network(bssid: &str) -> WifiNetwork {
        WifiNetwork {
            bssid: bssid.to_string(),
            ssid: "home".to_string(),
            signal_dbm: -50.0,
            band: "2.4GHz".to_string(),
            security: "wpa2".to_string(),
        }
    }

    #[tokio::test]
    async fn first_scan_writes_networks_and_publishes_changed() {
        let (world, clock) = world_state_with_fake_clock();
        let world = Arc::new(world);
        let events = EventBus::new();
        let mut sub = events.subscribe(None, aura_core::Priority::Low);
        let cancel = CancellationToken::new();
        let ctx = DaemonCtx::new(world.clone(), events, clock, cancel.clone());

        let mut daemon = WifiDaemon::new(FixedSource(vec![vec![network("aa:aa")], vec![network("aa:aa")]], 0));
        daemon.initialize(&ctx).await.unwrap();

        let run_ctx = ctx.clone();
        let handle = tokio::spawn(async move {
            let _ = daemon.run(run_ctx).await;
        });

        // Drain the RUNNING event, then the WifiChanged event from the
        // first scan (identical second scan publishes no further change).
        let mut saw_changed = false;
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_millis(200), sub.receiver.recv()).await;
            match event {
                Ok(Some(e)) if e.kind == EventKind::WifiChanged => saw_changed = true,
                _ => break,
            }
        }
        assert!(saw_changed);
        assert!(world.get("wifi.networks").is_some());
        cancel.cancel();
        let _ = handle.await;
    }

    #[test]
    fn no_wifi_adapter_reports_hardware_absent() {
        let mut adapter = NoWifiAdapter;
        assert!(matches!(adapter.scan(), Err(DaemonError::HardwareAbsent(_))));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bluetooth` sensor daemon — §4.4: owns `bluetooth.devices`, ≤15s
//! cadence, fast-fail init (e.g. a `bluetoothctl show` probe).

use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Capability, Category, DaemonId, EventKind, Value, WorldState};

use crate::base::{probe_with_timeout, Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq)]
pub struct BluetoothDevice {
    pub address: String,
    pub name: String,
    pub rssi: f64,
}

/// Seam standing in for `bluetoothctl`/BlueZ D-Bus access.
#[async_trait]
pub trait BluetoothSource: Send {
    /// Fast-fail presence probe run once during `initialize`.
    async fn probe(&mut self) -> Result<(), DaemonError>;
    fn scan(&mut self) -> Result<Vec<BluetoothDevice>, DaemonError>;
}

#[derive(Default)]
pub struct NoBluetoothAdapter;

#[async_trait]
impl BluetoothSource for NoBluetoothAdapter {
    async fn probe(&mut self) -> Result<(), DaemonError> {
        Err(DaemonError::HardwareAbsent("bluetooth adapter".to_string()))
    }

    fn scan(&mut self) -> Result<Vec<BluetoothDevice>, DaemonError> {
        Err(DaemonError::HardwareAbsent("bluetooth adapter".to_string()))
    }
}

fn device_to_value(d: &BluetoothDevice) -> Value {
    let mut map = std::collections::HashMap::new();
    map.insert("address".to_string(), Value::Text(d.address.clone()));
    map.insert("name".to_string(), Value::Text(d.name.clone()));
    map.insert("rssi".to_string(), Value::Number(d.rssi));
    Value::Map(map)
}

fn write_devices(world: &WorldState, devices: &[BluetoothDevice]) {
    world.update("bluetooth.devices", Value::List(devices.iter().map(device_to_value).collect()));
    world.update("bluetooth.device_count", Value::Number(devices.len() as f64));
    if !devices.is_empty() {
        let nearest = devices.iter().map(|d| d.rssi).fold(f64::MIN, f64::max);
        let avg = devices.iter().map(|d| d.rssi).sum::<f64>() / devices.len() as f64;
        world.update("bluetooth.nearest_rssi", Value::Number(nearest));
        world.update("bluetooth.avg_rssi", Value::Number(avg));
    }
}

pub struct BluetoothDaemon<S: BluetoothSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
}

impl<S: BluetoothSource> BluetoothDaemon<S> {
    pub fn new(source: S) -> Self {
        Self { id: DaemonId::new(), category: Category::new("bluetooth"), source, interval: DEFAULT_INTERVAL }
    }

    pub fn required_capabilities() -> Vec<Capability> {
        vec![Capability::BluetoothAdapter]
    }
}

#[async_trait]
impl<S: BluetoothSource + Send> Daemon for BluetoothDaemon<S> {
    fn id(&self) -> DaemonId {
        self.id
    }

    fn category(&self) -> &Category {
        &self.category
    }

    async fn initialize(&mut self, _ctx: &DaemonCtx) -> Result<(), DaemonError> {
        probe_with_timeout(self.source.probe()).await
    }

    async fn run(&mut self, ctx: DaemonCtx) -> Result<(), DaemonError> {
        ctx.publish_lifecycle(&self.category, self.id, EventKind::Running);
        loop {
            match self.source.scan() {
                Ok(devices) => write_devices(&ctx.world, &devices),
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

    struct FailingProbeSource;

    #[async_trait]
    impl BluetoothSource for FailingProbeSource {
        async fn probe(&mut self) -> Result<(), DaemonError> {
            Err(DaemonError::HardwareAbsent("bluetooth adapter".to_string()))
        }

        fn scan(&mut self) -> Result<Vec<BluetoothDevice>, DaemonError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn initialize_fast_fails_when_probe_reports_absent_hardware() {
        let (world, clock) = aura_core::test_support::world_state_with_fake_clock();
        let ctx = DaemonCtx::new(
            std::sync::Arc::new(world),
            aura_eventbus::EventBus::new(),
            clock,
            tokio_util::sync::CancellationToken::new(),
        );
        let mut daemon = BluetoothDaemon::new(FailingProbeSource);
        assert!(daemon.initialize(&ctx).await.is_err());
    }

    #[test]
    fn device_list_populates_nearest_and_average_rssi() {
        let (world, _clock) = aura_core::test_support::world_state_with_fake_clock();
        write_devices(
            &world,
            &[
                BluetoothDevice { address: "aa".to_string(), name: "x".to_string(), rssi: -40.0 },
                BluetoothDevice { address: "bb".to_string(), name: "y".to_string(), rssi: -80.0 },
            ],
        );
        assert_eq!(world.get("bluetooth.nearest_rssi"), Some(Value::Number(-40.0)));
        assert_eq!(world.get("bluetooth.avg_rssi"), Some(Value::Number(-60.0)));
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `hardware_monitor` sensor daemon — §4.4: 5s cadence, enumerates
//! connected devices, publishes `HardwareAdded`/`HardwareRemoved` on
//! set differences.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Category, DaemonId, Event, EventKind, Priority, Value};

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Seam standing in for USB/I2C/PCIe bus enumeration.
pub trait DeviceEnumerator: Send {
    fn enumerate(&mut self) -> Result<BTreeSet<String>, DaemonError>;
}

#[derive(Default)]
pub struct NoDeviceEnumerator;

impl DeviceEnumerator for NoDeviceEnumerator {
    fn enumerate(&mut self) -> Result<BTreeSet<String>, DaemonError> {
        Ok(BTreeSet::new())
    }
}

pub struct HardwareMonitorDaemon<E: DeviceEnumerator> {
    id: DaemonId,
    category: Category,
    enumerator: E,
    interval: Duration,
    known: BTreeSet<String>,
}

impl<E: DeviceEnumerator> HardwareMonitorDaemon<E> {
    pub fn new(enumerator: E) -> Self {
        Self {
            id: DaemonId::new(),
            category: Category::new("hardware_monitor"),
            enumerator,
            interval: DEFAULT_INTERVAL,
            known: BTreeSet::new(),
        }
    }

    fn apply(&mut self, ctx: &DaemonCtx, devices: BTreeSet<String>) {
        let added: Vec<_> = devices.difference(&self.known).cloned().collect();
        let removed: Vec<_> = self.known.difference(&devices).cloned().collect();

        ctx.world.update("hardware_monitor.device_count", Value::Number(devices.len() as f64));
        ctx.world.update("hardware_monitor.added_flag", Value::Bool(!added.is_empty()));
        ctx.world.update("hardware_monitor.removed_flag", Value::Bool(!removed.is_empty()));

        let at_epoch_ms = ctx.clock.epoch_ms();
        for path in &added {
            ctx.events.publish(Event::new(
                self.category.clone(),
                EventKind::HardwareAdded,
                Priority::Normal,
                self.id,
                at_epoch_ms,
            ).with_payload(serde_json::json!({ "device_path": path })));
        }
        for path in &removed {
            ctx.events.publish(Event::new(
                self.category.clone(),
                EventKind::HardwareRemoved,
                Priority::Normal,
                self.id,
                at_epoch_ms,
            ).with_payload(serde_json::json!({ "device_path": path })));
        }
        self.known = devices;
    }
}

#[async_trait]
impl<E: DeviceEnumerator + Send> Daemon for HardwareMonitorDaemon<E> {
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
            let devices = self.enumerator.enumerate()?;
            self.apply(&ctx, devices);
            if crate::sensors::sleep_or_cancel(self.interval, &ctx.cancel).await {
                break;
            }
        }
        ctx.publish_lifecycle(&self.category, self.id, EventKind::Stopped);
        Ok(())
    }

    async fn stop(&mut self) {}
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flipper` sensor daemon — §4.4: owns `rf.sub_ghz.*`, `rf.nfc.*`,
//! `rf.ir.*`; mutually exclusive with any other serial-port consumer on
//! the same device via [`crate::serial::SerialPortManager`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Category, DaemonId, EventKind, Value};

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;
use crate::serial::{SerialLease, SerialPortManager};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RfSample {
    pub sub_ghz_active: bool,
    pub sub_ghz_signal: f64,
    pub nfc_active: bool,
    pub nfc_tag_present: bool,
    pub ir_active: bool,
    pub ir_code_received: bool,
}

pub trait FlipperSource: Send {
    fn read(&mut self) -> Result<RfSample, DaemonError>;
}

#[derive(Default)]
pub struct NoFlipper;

impl FlipperSource for NoFlipper {
    fn read(&mut self) -> Result<RfSample, DaemonError> {
        Err(DaemonError::HardwareAbsent("flipper zero".to_string()))
    }
}

fn apply(world: &aura_core::WorldState, sample: RfSample) {
    world.update("rf.sub_ghz.active_flag", Value::Bool(sample.sub_ghz_active));
    world.update("rf.sub_ghz.signal", Value::Number(sample.sub_ghz_signal));
    world.update("rf.nfc.active_flag", Value::Bool(sample.nfc_active));
    world.update("rf.nfc.tag_present_flag", Value::Bool(sample.nfc_tag_present));
    world.update("rf.ir.active_flag", Value::Bool(sample.ir_active));
    world.update("rf.ir.code_received_flag", Value::Bool(sample.ir_code_received));
}

pub struct FlipperDaemon<S: FlipperSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
    port_manager: Arc<SerialPortManager>,
    port_path: PathBuf,
    lease: Option<SerialLease>,
}

impl<S: FlipperSource> FlipperDaemon<S> {
    pub fn new(source: S, port_manager: Arc<SerialPortManager>, port_path: PathBuf) -> Self {
        Self {
            id: DaemonId::new(),
            category: Category::new("flipper"),
            source,
            interval: DEFAULT_INTERVAL,
            port_manager,
            port_path,
            lease: None,
        }
    }
}

#[async_trait]
impl<S: FlipperSource + Send> Daemon for FlipperDaemon<S> {
    fn id(&self) -> DaemonId {
        self.id
    }

    fn category(&self) -> &Category {
        &self.category
    }

    async fn initialize(&mut self, _ctx: &DaemonCtx) -> Result<(), DaemonError> {
        let lease = self
            .port_manager
            .acquire(&self.port_path, self.id)
            .map_err(|err| DaemonError::HardwareTransient(err.to_string()))?;
        self.lease = Some(lease);
        Ok(())
    }

    async fn run(&mut self, ctx: DaemonCtx) -> Result<(), DaemonError> {
        if self.lease.is_none() {
            // Degrade gracefully rather than open the device unguarded
            // (§4.4 serial-port arbitration note).
            ctx.publish_lifecycle(&self.category, self.id, EventKind::Degraded);
            return Err(DaemonError::HardwareAbsent("serial port not acquired".to_string()));
        }
        ctx.publish_lifecycle(&self.category, self.id, EventKind::Running);
        loop {
            match self.source.read() {
                Ok(sample) => apply(&ctx.world, sample),
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

    async fn stop(&mut self) {
        if let Some(lease) = self.lease.take() {
            let _ = self.port_manager.release(&lease);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_support::world_state_with_fake_clock;
    use aura_eventbus::EventBus;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> DaemonCtx {
        let (world, clock) = world_state_with_fake_clock();
        DaemonCtx::new(Arc::new(world), EventBus::new(), clock, CancellationToken::new())
    }

    #[tokio::test]
    async fn acquires_port_on_initialize_and_releases_on_stop() {
        let ctx = ctx();
        let port_manager = Arc::new(SerialPortManager::new());
        let path = PathBuf::from("/dev/ttyACM0");
        let mut daemon = FlipperDaemon::new(NoFlipper, port_manager.clone(), path.clone());

        // NoFlipper::read always errors, but initialize only acquires.
        assert!(daemon.initialize(&ctx).await.is_ok());
        assert!(port_manager.is_held(&path));

        daemon.stop().await;
        assert!(!port_manager.is_held(&path));
    }

    #[tokio::test]
    async fn second_daemon_on_same_path_fails_to_initialize() {
        let ctx = ctx();
        let port_manager = Arc::new(SerialPortManager::new());
        let path = PathBuf::from("/dev/ttyACM0");
        let mut a = FlipperDaemon::new(NoFlipper, port_manager.clone(), path.clone());
        let mut b = FlipperDaemon::new(NoFlipper, port_manager.clone(), path.clone());

        a.initialize(&ctx).await.unwrap();
        assert!(b.initialize(&ctx).await.is_err());
    }
}

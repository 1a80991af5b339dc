// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `imu` sensor daemon — §4.4: owns `imu.{accel,gyro,orientation}` at
//! up to 60 Hz, the highest-rate sensor contract in §1's "wildly
//! different rates" requirement.

use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Capability, Category, DaemonId, EventKind, Value};

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(17); // ~60 Hz

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub orientation: [f32; 3],
}

/// Seam standing in for a real IMU register read.
pub trait ImuSource: Send {
    fn read(&mut self) -> Result<ImuSample, DaemonError>;
}

#[derive(Default)]
pub struct NoImu;

impl ImuSource for NoImu {
    fn read(&mut self) -> Result<ImuSample, DaemonError> {
        Err(DaemonError::HardwareAbsent("imu".to_string()))
    }
}

pub struct ImuDaemon<S: ImuSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
}

impl<S: ImuSource> ImuDaemon<S> {
    pub fn new(source: S) -> Self {
        Self { id: DaemonId::new(), category: Category::new("imu"), source, interval: DEFAULT_INTERVAL }
    }

    pub fn required_capabilities() -> Vec<Capability> {
        vec![Capability::Imu]
    }
}

fn magnitude(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[async_trait]
impl<S: ImuSource + Send> Daemon for ImuDaemon<S> {
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
            match self.source.read() {
                Ok(sample) => {
                    ctx.world.update("imu.accel", Value::Buffer(sample.accel.to_vec()));
                    ctx.world.update("imu.gyro", Value::Buffer(sample.gyro.to_vec()));
                    ctx.world.update("imu.orientation", Value::Buffer(sample.orientation.to_vec()));
                    ctx.world.update(
                        "imu.motion_magnitude",
                        Value::Number(f64::from(magnitude(sample.accel))),
                    );
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

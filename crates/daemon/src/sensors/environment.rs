// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `environment` sensor daemon — §4.4: owns
//! `environment.{temperature,humidity,pressure,light}` "as available";
//! a field stays absent from WorldState when its sensor isn't present,
//! never written as a silent default (§3 invariant iv) — only
//! `FeatureExtractor` ever supplies a neutral default, and only at
//! extraction time.

use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Category, DaemonId, EventKind, Value};

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Each field is `None` when that particular sensor isn't wired up on
/// this device — distinct from a `DaemonError`, which means the whole
/// probe failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentSample {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub light_lux: Option<f64>,
}

pub trait EnvironmentSource: Send {
    fn read(&mut self) -> Result<EnvironmentSample, DaemonError>;
}

#[derive(Default)]
pub struct NoEnvironmentSensors;

impl EnvironmentSource for NoEnvironmentSensors {
    fn read(&mut self) -> Result<EnvironmentSample, DaemonError> {
        Ok(EnvironmentSample::default())
    }
}

fn apply(world: &aura_core::WorldState, sample: EnvironmentSample) {
    write_optional(world, "environment.temperature", sample.temperature_c);
    write_optional(world, "environment.humidity", sample.humidity_pct);
    write_optional(world, "environment.pressure", sample.pressure_hpa);
    write_optional(world, "environment.light", sample.light_lux);
    world.update("environment.temperature_present_flag", Value::Bool(sample.temperature_c.is_some()));
    world.update("environment.light_present_flag", Value::Bool(sample.light_lux.is_some()));
}

fn write_optional(world: &aura_core::WorldState, path: &str, value: Option<f64>) {
    if let Some(v) = value {
        world.update(path, Value::Number(v));
    }
}

pub struct EnvironmentDaemon<S: EnvironmentSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
}

impl<S: EnvironmentSource> EnvironmentDaemon<S> {
    pub fn new(source: S) -> Self {
        Self { id: DaemonId::new(), category: Category::new("environment"), source, interval: DEFAULT_INTERVAL }
    }
}

#[async_trait]
impl<S: EnvironmentSource + Send> Daemon for EnvironmentDaemon<S> {
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
            let sample = self.source.read()?;
            apply(&ctx.world, sample);
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

    #[test]
    fn absent_sensor_leaves_key_unset_rather_than_defaulted() {
        let (world, _clock) = world_state_with_fake_clock();
        apply(&world, EnvironmentSample { temperature_c: Some(21.5), ..Default::default() });
        assert_eq!(world.get("environment.temperature"), Some(Value::Number(21.5)));
        assert!(world.get("environment.humidity").is_none());
        assert_eq!(world.get("environment.temperature_present_flag"), Some(Value::Bool(true)));
        assert_eq!(world.get("environment.light_present_flag"), Some(Value::Bool(false)));
    }
}

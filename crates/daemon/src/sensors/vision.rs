// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `vision` sensor daemon — §4.4: owns `vision.detected_objects`.
//!
//! Object detection itself is an out-of-process collaborator (§1); this
//! daemon only validates and stores whatever that collaborator
//! publishes, deriving the small set of flags `FeatureExtractor` reads.
//! A malformed detection is dropped and logged (§7 `ProtocolError`),
//! never forwarded into WorldState.

use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Category, DaemonId, EventKind, Value};
use tracing::warn;

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
}

/// Seam standing in for the out-of-process vision collaborator's IPC
/// channel.
pub trait VisionSource: Send {
    /// Returns the latest detection batch, or `None` if no new batch has
    /// arrived since the last poll (distinct from an empty batch, which
    /// means "nothing detected this frame").
    fn poll(&mut self) -> Option<Vec<DetectedObject>>;
}

#[derive(Default)]
pub struct NoVisionBackend;

impl VisionSource for NoVisionBackend {
    fn poll(&mut self) -> Option<Vec<DetectedObject>> {
        None
    }
}

/// Validates one detection: confidence must be finite and in `[0, 1]`,
/// label non-empty. Anything else is a protocol error.
fn validate(objects: Vec<DetectedObject>) -> Result<Vec<DetectedObject>, DaemonError> {
    for obj in &objects {
        if obj.label.is_empty() {
            return Err(DaemonError::Protocol("detected object has empty label".to_string()));
        }
        if !obj.confidence.is_finite() || !(0.0..=1.0).contains(&obj.confidence) {
            return Err(DaemonError::Protocol(format!(
                "detected object {:?} has out-of-range confidence {}",
                obj.label, obj.confidence
            )));
        }
    }
    Ok(objects)
}

fn apply(world: &aura_core::WorldState, objects: &[DetectedObject], motion: bool) {
    let list = Value::List(
        objects
            .iter()
            .map(|o| {
                let mut map = std::collections::HashMap::new();
                map.insert("label".to_string(), Value::Text(o.label.clone()));
                map.insert("confidence".to_string(), Value::Number(f64::from(o.confidence)));
                Value::Map(map)
            })
            .collect(),
    );
    world.update("vision.detected_objects", list);
    world.update("vision.object_count", Value::Number(objects.len() as f64));
    world.update("vision.person_present_flag", Value::Bool(objects.iter().any(|o| o.label == "person")));
    world.update(
        "vision.face_count",
        Value::Number(objects.iter().filter(|o| o.label == "face").count() as f64),
    );
    world.update("vision.motion_flag", Value::Bool(motion));
}

pub struct VisionDaemon<S: VisionSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
    last_object_count: usize,
}

impl<S: VisionSource> VisionDaemon<S> {
    pub fn new(source: S) -> Self {
        Self {
            id: DaemonId::new(),
            category: Category::new("vision"),
            source,
            interval: DEFAULT_INTERVAL,
            last_object_count: 0,
        }
    }
}

#[async_trait]
impl<S: VisionSource + Send> Daemon for VisionDaemon<S> {
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
            if let Some(raw) = self.source.poll() {
                match validate(raw) {
                    Ok(objects) => {
                        let motion = objects.len() != self.last_object_count;
                        self.last_object_count = objects.len();
                        apply(&ctx.world, &objects, motion);
                    }
                    Err(err) => {
                        warn!(daemon = %self.id, error = %err, "dropped malformed vision payload");
                    }
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

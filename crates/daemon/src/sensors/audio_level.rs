// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `audio_level` sensor daemon — §4.4: owns `audio.level_db`,
//! `audio.peak` at ~30 Hz.

use std::time::Duration;

use async_trait::async_trait;
use aura_core::{Capability, Category, DaemonId, EventKind, Value};

use crate::base::{Daemon, DaemonCtx};
use crate::error::DaemonError;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(33); // ~30 Hz

const VOICE_ACTIVITY_THRESHOLD_DB: f32 = -35.0;
const SILENCE_THRESHOLD_DB: f32 = -55.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSample {
    pub level_db: f32,
    pub peak: f32,
}

/// Seam standing in for a real audio input device read.
pub trait AudioSource: Send {
    fn read(&mut self) -> Result<AudioSample, DaemonError>;
}

#[derive(Default)]
pub struct NoAudioInput;

impl AudioSource for NoAudioInput {
    fn read(&mut self) -> Result<AudioSample, DaemonError> {
        Err(DaemonError::HardwareAbsent("audio input".to_string()))
    }
}

pub struct AudioLevelDaemon<S: AudioSource> {
    id: DaemonId,
    category: Category,
    source: S,
    interval: Duration,
}

impl<S: AudioSource> AudioLevelDaemon<S> {
    pub fn new(source: S) -> Self {
        Self { id: DaemonId::new(), category: Category::new("audio"), source, interval: DEFAULT_INTERVAL }
    }

    pub fn required_capabilities() -> Vec<Capability> {
        vec![Capability::AudioInput]
    }
}

#[async_trait]
impl<S: AudioSource + Send> Daemon for AudioLevelDaemon<S> {
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
                    ctx.world.update("audio.level_db", Value::Number(f64::from(sample.level_db)));
                    ctx.world.update("audio.peak", Value::Number(f64::from(sample.peak)));
                    ctx.world.update(
                        "audio.voice_activity_flag",
                        Value::Bool(sample.level_db > VOICE_ACTIVITY_THRESHOLD_DB),
                    );
                    ctx.world.update(
                        "audio.silence_flag",
                        Value::Bool(sample.level_db < SILENCE_THRESHOLD_DB),
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

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide, read-mostly configuration.
//!
//! Loaded once at startup from a TOML file (optionally overridden by CLI
//! flags in `aura-companion`), then handed out by `Arc` to every component
//! that needs it. An invalid config is a [`ConfigError`], which the caller
//! is expected to turn into exit code 2 — see §7 of the design notes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selects the fallback particle generator used when the accelerator or
/// model is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Low-frequency procedural motion on the unit sphere.
    Procedural,
    /// Particles freeze at their last known (or initial) positions.
    Quiescent,
}

impl Default for FallbackMode {
    fn default() -> Self {
        FallbackMode::Procedural
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },

    #[error("invalid configuration: {0}")]
    InvalidRange(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target_fps: u32,
    pub particle_count: usize,
    pub model_path: Option<PathBuf>,
    pub fallback_mode: FallbackMode,
    pub interpolation_alpha: f32,
    #[serde(with = "duration_secs_f64")]
    pub feature_cache_ttl: Duration,
    pub warmup_frames: u32,
    pub slow_frame_threshold_ms: f64,
    pub metrics_report_interval_s: f64,
    pub heartbeat_path: PathBuf,
    pub heartbeat_timeout_s: f64,
    pub serial_port_mapping: HashMap<String, PathBuf>,

    /// CLI-only flags, folded into the same struct so the rest of the
    /// crate graph has one configuration type to read from.
    pub no_voice_input: bool,
    pub no_voice_output: bool,
    pub headless: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_fps: 60,
            particle_count: crate::vector::PARTICLE_COUNT_DEFAULT,
            model_path: None,
            fallback_mode: FallbackMode::default(),
            interpolation_alpha: 0.3,
            feature_cache_ttl: Duration::from_millis(100),
            warmup_frames: 5,
            slow_frame_threshold_ms: 20.0,
            metrics_report_interval_s: 5.0,
            heartbeat_path: PathBuf::from("/run/aura/heartbeat"),
            heartbeat_timeout_s: 10.0,
            serial_port_mapping: HashMap::new(),
            no_voice_input: false,
            no_voice_output: false,
            headless: false,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file. Any field absent
    /// from the file keeps its [`Default`] value.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Config = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == 0 || self.target_fps > 240 {
            return Err(ConfigError::InvalidRange(format!(
                "target_fps must be in 1..=240, got {}",
                self.target_fps
            )));
        }
        if self.particle_count == 0 {
            return Err(ConfigError::InvalidRange("particle_count must be > 0".to_string()));
        }
        if !(self.interpolation_alpha > 0.0 && self.interpolation_alpha <= 1.0) {
            return Err(ConfigError::InvalidRange(format!(
                "interpolation_alpha must be in (0,1], got {}",
                self.interpolation_alpha
            )));
        }
        if self.warmup_frames == 0 {
            return Err(ConfigError::InvalidRange("warmup_frames must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps))
    }
}

mod duration_secs_f64 {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

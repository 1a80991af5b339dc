// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure WorldState-snapshot-to-FeatureVector extraction.
//!
//! `F` is frozen at [`aura_core::FEATURE_DIM`] (68) — see DESIGN.md for the
//! schema-length resolution. The schema below is a fixed, ordered table;
//! the model this feeds must be co-versioned with it, and the engine
//! refuses to load a model whose input shape disagrees (see
//! `crate::engine`).

use aura_core::{Value, WorldSnapshot, FEATURE_DIM};

use crate::probe::ProbeSample;

/// How a raw reading is mapped into `[0, 1]`.
#[derive(Debug, Clone, Copy)]
pub enum Normalize {
    /// `clamp(raw / divisor, 0, 1)`. Missing input defaults to 0.5.
    ClampDiv(f32),
    /// `clamp((raw - min) / (max - min), 0, 1)`. Missing input defaults to 0.5.
    ClampRange(f32, f32),
    /// Already in `[0, 1]`; clamped defensively. Missing input defaults to 0.5.
    Identity01,
    /// Boolean presence. Missing input defaults to 0.0.
    Flag,
    /// `clamp(count / divisor, 0, 1)`. Missing input defaults to 0.0.
    Count(f32),
    /// A placeholder schema slot reserved for a model input this build
    /// doesn't populate yet. Always yields the neutral default 0.5.
    Reserved,
}

impl Normalize {
    fn missing_default(self) -> f32 {
        match self {
            Normalize::Flag | Normalize::Count(_) => 0.0,
            _ => 0.5,
        }
    }

    fn apply(self, raw: f32) -> f32 {
        let v = match self {
            Normalize::ClampDiv(divisor) => raw / divisor.max(f32::EPSILON),
            Normalize::ClampRange(min, max) => (raw - min) / (max - min).max(f32::EPSILON),
            Normalize::Identity01 => raw,
            Normalize::Flag => raw,
            Normalize::Count(divisor) => raw / divisor.max(f32::EPSILON),
            Normalize::Reserved => 0.5,
        };
        v.clamp(0.0, 1.0)
    }
}

/// Where a schema slot's raw value comes from.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// A WorldState key, optionally indexing into a `Value::Buffer`.
    World { path: &'static str, component: Option<usize> },
    Probe(ProbeField),
    /// No source at all — used by [`Normalize::Reserved`] slots.
    None,
}

#[derive(Debug, Clone, Copy)]
pub enum ProbeField {
    CpuLoad,
    MemUsed,
    CpuTemp,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub source: Source,
    pub normalize: Normalize,
}

const fn world(path: &'static str, normalize: Normalize) -> FieldSpec {
    FieldSpec { source: Source::World { path, component: None }, normalize }
}

const fn world_component(path: &'static str, component: usize, normalize: Normalize) -> FieldSpec {
    FieldSpec { source: Source::World { path, component: Some(component) }, normalize }
}

const fn probe(field: ProbeField, normalize: Normalize) -> FieldSpec {
    FieldSpec { source: Source::Probe(field), normalize }
}

const fn reserved() -> FieldSpec {
    FieldSpec { source: Source::None, normalize: Normalize::Reserved }
}

/// The fixed, ordered feature schema. Index order is part of the contract
/// with the deployed model and must never be reordered without a model
/// re-export.
pub static SCHEMA: [FieldSpec; FEATURE_DIM] = [
    // Wi-Fi (0..6)
    world("wifi.network_count", Normalize::Count(20.0)),
    world("wifi.best_signal_dbm", Normalize::ClampRange(-100.0, -30.0)),
    world("wifi.avg_signal_dbm", Normalize::ClampRange(-100.0, -30.0)),
    world("wifi.band_24ghz_fraction", Normalize::Identity01),
    world("wifi.band_5ghz_fraction", Normalize::Identity01),
    world("wifi.secure_fraction", Normalize::Identity01),
    // Bluetooth (6..9)
    world("bluetooth.device_count", Normalize::Count(10.0)),
    world("bluetooth.nearest_rssi", Normalize::ClampRange(-100.0, -30.0)),
    world("bluetooth.avg_rssi", Normalize::ClampRange(-100.0, -30.0)),
    // Hardware monitor (9..12)
    world("hardware_monitor.device_count", Normalize::Count(16.0)),
    world("hardware_monitor.added_flag", Normalize::Flag),
    world("hardware_monitor.removed_flag", Normalize::Flag),
    // IMU (12..22)
    world_component("imu.accel", 0, Normalize::ClampRange(-20.0, 20.0)),
    world_component("imu.accel", 1, Normalize::ClampRange(-20.0, 20.0)),
    world_component("imu.accel", 2, Normalize::ClampRange(-20.0, 20.0)),
    world_component("imu.gyro", 0, Normalize::ClampRange(-250.0, 250.0)),
    world_component("imu.gyro", 1, Normalize::ClampRange(-250.0, 250.0)),
    world_component("imu.gyro", 2, Normalize::ClampRange(-250.0, 250.0)),
    world_component("imu.orientation", 0, Normalize::ClampRange(-180.0, 180.0)),
    world_component("imu.orientation", 1, Normalize::ClampRange(-180.0, 180.0)),
    world_component("imu.orientation", 2, Normalize::ClampRange(-180.0, 180.0)),
    world("imu.motion_magnitude", Normalize::ClampDiv(20.0)),
    // Audio (22..26)
    world("audio.level_db", Normalize::ClampRange(-60.0, 0.0)),
    world("audio.peak", Normalize::Identity01),
    world("audio.voice_activity_flag", Normalize::Flag),
    world("audio.silence_flag", Normalize::Flag),
    // Environment (26..32)
    world("environment.temperature", Normalize::ClampDiv(40.0)),
    world("environment.humidity", Normalize::ClampDiv(100.0)),
    world("environment.pressure", Normalize::ClampRange(950.0, 1050.0)),
    world("environment.light", Normalize::ClampDiv(1000.0)),
    world("environment.temperature_present_flag", Normalize::Flag),
    world("environment.light_present_flag", Normalize::Flag),
    // RF / Flipper (32..38)
    world("rf.sub_ghz.active_flag", Normalize::Flag),
    world("rf.nfc.active_flag", Normalize::Flag),
    world("rf.ir.active_flag", Normalize::Flag),
    world("rf.sub_ghz.signal", Normalize::Identity01),
    world("rf.nfc.tag_present_flag", Normalize::Flag),
    world("rf.ir.code_received_flag", Normalize::Flag),
    // Vision (38..42)
    world("vision.object_count", Normalize::Count(10.0)),
    world("vision.person_present_flag", Normalize::Flag),
    world("vision.face_count", Normalize::Count(5.0)),
    world("vision.motion_flag", Normalize::Flag),
    // Conversation bridge (42..45)
    world("conversation.user_message_present_flag", Normalize::Flag),
    world("conversation.response_present_flag", Normalize::Flag),
    world("conversation.active_flag", Normalize::Flag),
    // System probe (45..48)
    probe(ProbeField::CpuLoad, Normalize::Identity01),
    probe(ProbeField::MemUsed, Normalize::Identity01),
    probe(ProbeField::CpuTemp, Normalize::ClampDiv(100.0)),
    // Reserved for future model inputs (48..68)
    reserved(), reserved(), reserved(), reserved(), reserved(),
    reserved(), reserved(), reserved(), reserved(), reserved(),
    reserved(), reserved(), reserved(), reserved(), reserved(),
    reserved(), reserved(), reserved(), reserved(), reserved(),
];

fn value_as_f32(value: &Value, component: Option<usize>) -> Option<f32> {
    match (value, component) {
        (Value::Number(n), None) => Some(*n as f32),
        (Value::Bool(b), None) => Some(if *b { 1.0 } else { 0.0 }),
        (Value::List(items), None) => Some(items.len() as f32),
        (Value::Buffer(buf), Some(i)) => buf.get(i).copied(),
        (Value::Buffer(buf), None) => buf.first().copied(),
        _ => None,
    }
}

fn resolve(spec: &FieldSpec, snapshot: &WorldSnapshot, probe: &ProbeSample) -> f32 {
    match spec.source {
        Source::World { path, component } => match snapshot.get(path) {
            Some(value) => match value_as_f32(value, component) {
                Some(raw) => spec.normalize.apply(raw),
                None => spec.normalize.missing_default(),
            },
            None => spec.normalize.missing_default(),
        },
        Source::Probe(field) => {
            let raw = match field {
                ProbeField::CpuLoad => probe.cpu_load,
                ProbeField::MemUsed => probe.mem_used,
                ProbeField::CpuTemp => probe.cpu_temp_c,
            };
            spec.normalize.apply(raw)
        }
        Source::None => spec.normalize.missing_default(),
    }
}

/// `extract(snapshot) → FeatureVector` — deterministic, no I/O beyond the
/// already-sampled `probe`. Every output lies in `[0, 1]`; a missing input
/// always resolves to its documented neutral default, never `NaN`.
pub fn extract(snapshot: &WorldSnapshot, probe: &ProbeSample) -> [f32; FEATURE_DIM] {
    let mut out = [0.0f32; FEATURE_DIM];
    for (i, spec) in SCHEMA.iter().enumerate() {
        let v = resolve(spec, snapshot, probe);
        debug_assert!(v.is_finite(), "feature {i} resolved to non-finite value");
        out[i] = v.clamp(0.0, 1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::{SystemClock, WorldState};
    use std::sync::Arc;

    fn empty_snapshot() -> WorldSnapshot {
        let ws = WorldState::new(Arc::new(SystemClock));
        ws.get_snapshot()
    }

    #[test]
    fn empty_snapshot_yields_documented_neutral_defaults_no_nan() {
        let probe = ProbeSample::default();
        let vector = extract(&empty_snapshot(), &probe);
        assert_eq!(vector.len(), FEATURE_DIM);
        for (i, spec) in SCHEMA.iter().enumerate() {
            assert!(vector[i].is_finite(), "index {i} is not finite");
            assert_eq!(vector[i], spec.normalize.missing_default(), "index {i} mismatch");
        }
    }

    #[test]
    fn extraction_is_idempotent_on_the_same_snapshot() {
        let clock = Arc::new(SystemClock);
        let ws = WorldState::new(clock);
        ws.update("environment.temperature", Value::Number(22.0));
        let snapshot = ws.get_snapshot();
        let probe = ProbeSample { cpu_load: 0.4, mem_used: 0.6, cpu_temp_c: 50.0 };

        let first = extract(&snapshot, &probe);
        let second = extract(&snapshot, &probe);
        assert_eq!(first, second);
    }

    #[test]
    fn all_outputs_stay_within_unit_range_for_extreme_inputs() {
        let clock = Arc::new(SystemClock);
        let ws = WorldState::new(clock);
        ws.update("environment.temperature", Value::Number(1000.0));
        ws.update("wifi.best_signal_dbm", Value::Number(-1000.0));
        ws.update("imu.accel", Value::Buffer(vec![999.0, -999.0, 0.0]));
        let snapshot = ws.get_snapshot();
        let vector = extract(&snapshot, &ProbeSample::default());
        assert!(vector.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn imu_buffer_components_index_correctly() {
        let clock = Arc::new(SystemClock);
        let ws = WorldState::new(clock);
        ws.update("imu.accel", Value::Buffer(vec![10.0, -10.0, 0.0]));
        let snapshot = ws.get_snapshot();
        let vector = extract(&snapshot, &ProbeSample::default());
        // index 12 = accel.x, clamp(-20,20): (10 - (-20))/40 = 0.75
        assert!((vector[12] - 0.75).abs() < 1e-6);
        // index 13 = accel.y: (-10 - (-20))/40 = 0.25
        assert!((vector[13] - 0.25).abs() < 1e-6);
    }
}

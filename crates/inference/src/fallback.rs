// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic fallback particle generator used whenever the
//! accelerator or model is unavailable — §4.7's FALLBACK mode and the
//! §9 open question ("slow, procedural, responsive") frozen to one
//! concrete choice: low-frequency trigonometric drift of each particle
//! around its own point on the unit sphere.
//!
//! No accelerator, no allocation beyond the engine's own reused output
//! buffer, and no external noise crate — every particle's position is a
//! closed-form function of its index and the current phase, so two calls
//! at the same phase always produce the same frame.

use aura_core::{Config, FallbackMode};

const TAU: f32 = std::f32::consts::TAU;

/// Produces particle frames without any accelerator. Two modes share
/// this one generator so the visualization loop never branches on
/// `fallback_mode` itself (SPEC_FULL §8).
pub struct FallbackGenerator {
    mode: FallbackMode,
    particle_count: usize,
    /// Golden-angle increment used to spread particles evenly over the
    /// sphere regardless of `particle_count`.
    base_points: Vec<[f32; 3]>,
}

impl FallbackGenerator {
    pub fn new(config: &Config) -> Self {
        let particle_count = config.particle_count;
        Self { mode: config.fallback_mode, particle_count, base_points: fibonacci_sphere(particle_count) }
    }

    /// Write a fallback frame for wall-clock `phase_seconds` into `out`.
    /// `out` must already have `particle_count` entries; this never
    /// resizes it.
    pub fn fill(&self, phase_seconds: f64, out: &mut [[f32; 3]]) {
        debug_assert_eq!(out.len(), self.particle_count);
        match self.mode {
            FallbackMode::Quiescent => {
                out.copy_from_slice(&self.base_points);
            }
            FallbackMode::Procedural => {
                // Low-frequency (≈0.05 Hz) wobble: each particle drifts
                // around its base point on the sphere, phase-offset by
                // its own index so the whole field doesn't pulse in
                // lockstep.
                let phase = (phase_seconds * 0.05 * std::f64::consts::TAU) as f32;
                for (i, (p, base)) in out.iter_mut().zip(self.base_points.iter()).enumerate() {
                    let offset = (i as f32 / self.particle_count.max(1) as f32) * TAU;
                    let wobble = 0.08 * (phase + offset).sin();
                    let radius = 1.0 + wobble;
                    p[0] = base[0] * radius;
                    p[1] = base[1] * radius;
                    p[2] = base[2] * radius;
                }
            }
        }
    }
}

/// Evenly distributes `n` points on the unit sphere via the fibonacci
/// lattice construction — cheap, deterministic, no trig-heavy rejection
/// sampling.
fn fibonacci_sphere(n: usize) -> Vec<[f32; 3]> {
    if n == 0 {
        return Vec::new();
    }
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - (i as f32 / (n.max(1) - 1).max(1) as f32) * 2.0;
            let radius_at_y = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f32;
            [theta.cos() * radius_at_y, y, theta.sin() * radius_at_y]
        })
        .collect()
}

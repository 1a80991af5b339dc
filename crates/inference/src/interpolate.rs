// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential moving average over particle positions — §4.8.
//!
//! `P_out = alpha*P_new + (1-alpha)*P_prev`, computed in place into a
//! second pre-allocated buffer so the steady-state path never
//! allocates. On the first frame, or whenever the incoming shape
//! changes, the interpolator resets to a direct copy rather than
//! blending against a stale buffer of the wrong length.

pub struct ParticleInterpolator {
    alpha: f32,
    prev: Option<Vec<[f32; 3]>>,
}

impl ParticleInterpolator {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, prev: None }
    }

    /// Blend `new` against the held previous frame and return the
    /// smoothed result by reference. `new.len()` may differ from the
    /// previous call; a shape change resets rather than blends.
    pub fn step(&mut self, new: &[[f32; 3]]) -> &[[f32; 3]] {
        match &mut self.prev {
            Some(prev) if prev.len() == new.len() => {
                for (p, n) in prev.iter_mut().zip(new.iter()) {
                    p[0] = self.alpha * n[0] + (1.0 - self.alpha) * p[0];
                    p[1] = self.alpha * n[1] + (1.0 - self.alpha) * p[1];
                    p[2] = self.alpha * n[2] + (1.0 - self.alpha) * p[2];
                }
            }
            _ => {
                self.prev = Some(new.to_vec());
            }
        }
        self.prev.as_deref().unwrap_or(&[])
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Accelerator-backed single-frame inference with a FALLBACK path —
//! §4.7.
//!
//! The Edge TPU runtime binding itself is an external collaborator
//! (§1): [`AcceleratorBackend`] is the seam a real interpreter binding
//! plugs into. Nothing in this crate links against a real TPU runtime;
//! [`InferenceEngine`] only knows how to drive the trait and fall back
//! deterministically when it errors.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use aura_core::{Config, FeatureVector, FEATURE_DIM};
use tracing::{info, warn};

use crate::error::AcceleratorError;
use crate::fallback::FallbackGenerator;

/// Shape of a loaded model's input or output tensor, as reported by the
/// backend after `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorShape {
    pub input_len: usize,
    pub output_particle_count: usize,
}

/// Timing summary from the warmup inferences run during `load` (§4.7:
/// "performs ≥5 warmup inferences; reports warmup latency").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    pub shape: TensorShape,
    pub warmup_runs: u32,
    pub warmup_p50: Duration,
    pub warmup_max: Duration,
}

/// The accelerator runtime binding seam. A real implementation wraps a
/// vendor interpreter handle; `infer_raw` must not allocate once
/// `load` has returned successfully.
pub trait AcceleratorBackend: Send {
    /// Load a model from `path`, allocate tensors, and report its
    /// shape. Any failure here (missing file, absent device, mismatched
    /// shape) is surfaced as an [`AcceleratorError`] and the engine
    /// moves to FALLBACK — it never retries `load` itself.
    fn load(&mut self, path: &Path) -> Result<TensorShape, AcceleratorError>;

    /// Run one inference. `features` has length `FEATURE_DIM`; `out`
    /// is pre-sized to the model's output particle count and must be
    /// written in place.
    fn infer_raw(&mut self, features: &FeatureVector, out: &mut [[f32; 3]]) -> Result<(), AcceleratorError>;
}

/// A backend that never loads — used when no accelerator binding is
/// configured at all, distinct from a backend that loaded and then
/// failed.
#[derive(Default)]
pub struct NoAccelerator;

impl AcceleratorBackend for NoAccelerator {
    fn load(&mut self, _path: &Path) -> Result<TensorShape, AcceleratorError> {
        Err(AcceleratorError::AcceleratorAbsent)
    }

    fn infer_raw(&mut self, _features: &FeatureVector, _out: &mut [[f32; 3]]) -> Result<(), AcceleratorError> {
        Err(AcceleratorError::AcceleratorAbsent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Loading,
    Ready,
    Fallback,
}

/// Rolling window used for the "3 inference errors in 10s" escalation
/// rule (§4.7 state machine edge).
struct ErrorWindow {
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl ErrorWindow {
    fn new(window: Duration) -> Self {
        Self { window, timestamps: VecDeque::new() }
    }

    fn record(&mut self, now: Instant) -> usize {
        self.timestamps.push_back(now);
        while let Some(&front) = self.timestamps.front() {
            if now.saturating_duration_since(front) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.len()
    }
}

/// Drives a single [`AcceleratorBackend`], handling load, warmup,
/// per-frame inference, and the FALLBACK transition. Owned exclusively
/// by the visualization loop thread (§5) — never called from elsewhere.
pub struct InferenceEngine<B: AcceleratorBackend> {
    backend: B,
    state: State,
    shape: Option<TensorShape>,
    output: Vec<[f32; 3]>,
    fallback: FallbackGenerator,
    error_window: ErrorWindow,
    model_path: Option<PathBuf>,
    warmup_frames: u32,
    started_at: Instant,
}

impl<B: AcceleratorBackend> InferenceEngine<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            state: State::Uninitialized,
            shape: None,
            output: vec![[0.0; 3]; config.particle_count],
            fallback: FallbackGenerator::new(config),
            error_window: ErrorWindow::new(Duration::from_secs(10)),
            model_path: config.model_path.clone(),
            warmup_frames: config.warmup_frames,
            started_at: Instant::now(),
        }
    }

    /// Attempt to load the configured model. On any failure the engine
    /// moves to FALLBACK and the caller may still run `infer` safely.
    pub fn load(&mut self) -> Result<LoadReport, AcceleratorError> {
        self.state = State::Loading;
        let Some(path) = self.model_path.clone() else {
            self.state = State::Fallback;
            warn!("no model_path configured; engine starting in FALLBACK");
            return Err(AcceleratorError::ModelMissing("<unset>".to_string()));
        };

        let shape = match self.backend.load(&path) {
            Ok(shape) => shape,
            Err(err) => {
                self.state = State::Fallback;
                warn!(error = %err, "model load failed; engine entering FALLBACK");
                return Err(err);
            }
        };

        if shape.input_len != FEATURE_DIM {
            self.state = State::Fallback;
            let err = AcceleratorError::ShapeMismatch { expected: FEATURE_DIM, got: shape.input_len };
            warn!(error = %err, "refusing mismatched model/feature schema; engine entering FALLBACK");
            return Err(err);
        }

        self.shape = Some(shape);
        self.output = vec![[0.0; 3]; shape.output_particle_count];

        let mut durations = Vec::with_capacity(self.warmup_frames as usize);
        let warmup_features: FeatureVector = [0.5; FEATURE_DIM];
        for _ in 0..self.warmup_frames {
            let start = Instant::now();
            if let Err(err) = self.backend.infer_raw(&warmup_features, &mut self.output) {
                self.state = State::Fallback;
                warn!(error = %err, "warmup inference failed; engine entering FALLBACK");
                return Err(err);
            }
            durations.push(start.elapsed());
        }
        durations.sort();
        let warmup_p50 = durations.get(durations.len() / 2).copied().unwrap_or_default();
        let warmup_max = durations.last().copied().unwrap_or_default();

        self.state = State::Ready;
        let report = LoadReport { shape, warmup_runs: self.warmup_frames, warmup_p50, warmup_max };
        info!(
            warmup_runs = report.warmup_runs,
            warmup_p50_us = report.warmup_p50.as_micros() as u64,
            warmup_max_us = report.warmup_max.as_micros() as u64,
            "inference engine ready"
        );
        Ok(report)
    }

    pub fn available(&self) -> bool {
        self.state == State::Ready
    }

    /// Run one inference and return the raw positions by reference into
    /// the engine's own reused buffer. Never blocks, never allocates —
    /// the caller (the visualization loop) already tracks its own `seq`
    /// and timestamp, so nothing here needs to own a copy of the
    /// positions just to attach them.
    pub fn infer(&mut self, features: &FeatureVector) -> &[[f32; 3]] {
        if self.state != State::Ready {
            self.infer_fallback();
            return &self.output;
        }

        match self.backend.infer_raw(features, &mut self.output) {
            Ok(()) => {}
            Err(err) => {
                let count = self.error_window.record(Instant::now());
                warn!(error = %err, window_count = count, "inference error");
                if count >= 3 {
                    self.state = State::Fallback;
                    warn!("3 inference errors within 10s; engine entering persistent FALLBACK");
                }
                self.infer_fallback();
            }
        }
        &self.output
    }

    fn infer_fallback(&mut self) {
        let phase = self.started_at.elapsed().as_secs_f64();
        self.fallback.fill(phase, &mut self.output);
    }
}

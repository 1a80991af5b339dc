// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Feature extraction, accelerator inference, temporal smoothing, and the
//! fallback path that keeps particle frames flowing when the accelerator
//! or model isn't available.

pub mod engine;
pub mod error;
pub mod fallback;
pub mod features;
pub mod interpolate;
pub mod probe;
pub mod record;

pub use engine::{AcceleratorBackend, InferenceEngine, LoadReport, TensorShape};
pub use error::AcceleratorError;
pub use fallback::FallbackGenerator;
pub use features::{extract, FieldSpec, SCHEMA};
pub use interpolate::ParticleInterpolator;
pub use probe::{ProbeSample, SystemProbe, SystemProbeCache};
pub use record::{DatasetRecorder, RecordError};

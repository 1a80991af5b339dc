// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional offline dataset recorder — §6 "Persisted state layout".
//!
//! Appends one JSON line per tick (`{timestamp, feature_vector, label}`)
//! to a file, purely additive and never read back by the core at
//! runtime. Used to capture training data for offline model retraining;
//! enabled only when a `--record-dataset <path>` flag is set.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use aura_core::FeatureVector;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to open dataset file {path}: {source}")]
    Open { path: String, #[source] source: std::io::Error },

    #[error("failed to write dataset row: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize dataset row: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Row<'a> {
    timestamp_epoch_ms: u64,
    feature_vector: &'a FeatureVector,
    label: Option<&'a str>,
}

/// Append-only columnar recorder. One instance per process; never
/// shared across threads without its own synchronization (the
/// visualization loop is the only writer).
pub struct DatasetRecorder {
    writer: BufWriter<File>,
}

impl DatasetRecorder {
    pub fn create(path: &Path) -> Result<Self, RecordError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| RecordError::Open { path: path.display().to_string(), source })?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    /// Append one row and flush immediately — recording is opt-in and
    /// off the hot path's latency budget, so durability is preferred
    /// over batching.
    pub fn record(&mut self, timestamp_epoch_ms: u64, features: &FeatureVector, label: Option<&str>) -> Result<(), RecordError> {
        let row = Row { timestamp_epoch_ms, feature_vector: features, label };
        let line = serde_json::to_string(&row)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

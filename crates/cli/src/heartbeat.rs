// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process heartbeat writer — §4.11, §12.
//!
//! Writes the current epoch-millisecond timestamp to `heartbeat_path` at
//! least once a second so an external supervisor (`crate::supervisor`)
//! can tell this process apart from a hung one. The write goes to a
//! sibling `.tmp` file first and is then renamed into place — on every
//! POSIX filesystem `rename` is atomic, so a concurrent reader never
//! observes a partially written timestamp.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Heartbeat writes happen at least this often, independent of
/// `heartbeat_timeout_s` — §4.11: "at least once per second."
const WRITE_INTERVAL: Duration = Duration::from_secs(1);

pub async fn run(path: PathBuf, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(WRITE_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = write_once(&path) {
                    warn!(error = %err, path = %path.display(), "heartbeat write failed");
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

fn write_once(path: &Path) -> std::io::Result<()> {
    let now_epoch_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&tmp_path, now_epoch_ms.to_string())?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Reads the heartbeat file and returns how long ago it was last
/// written, if it exists and parses. Used by the out-of-process
/// supervisor (`crate::supervisor`) to detect staleness.
pub fn age(path: &Path) -> Option<Duration> {
    let text = std::fs::read_to_string(path).ok()?;
    let written_epoch_ms: u128 = text.trim().parse().ok()?;
    let now_epoch_ms = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).ok()?.as_millis();
    let age_ms = now_epoch_ms.saturating_sub(written_epoch_ms);
    Some(Duration::from_millis(age_ms as u64))
}

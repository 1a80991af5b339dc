// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sensor daemon contracts — §4.4.
//!
//! The core depends only on the WorldState keys each daemon owns, never
//! on how a reading was parsed (§4.4: "The core depends only on the
//! keys, not on parsers"). Every module below follows the same shape:
//! a small `*Source` trait is the seam real hardware access plugs into
//! (out of core scope per §1); the `Daemon` impl polls that seam on a
//! fixed cadence, writes into [`aura_core::WorldState`], and publishes
//! events on the changes §4.4 names.

pub mod audio_level;
pub mod bluetooth;
pub mod environment;
pub mod flipper;
pub mod hardware_monitor;
pub mod imu;
pub mod vision;
pub mod wifi;

use std::time::Duration;

use tokio::select;
use tokio_util::sync::CancellationToken;

/// Sleep for `interval`, or return early if `cancel` fires. Returns
/// `true` if cancellation was observed (the caller's polling loop
/// should exit), `false` if the interval simply elapsed.
pub(crate) async fn sleep_or_cancel(interval: Duration, cancel: &CancellationToken) -> bool {
    select! {
        _ = tokio::time::sleep(interval) => false,
        _ = cancel.cancelled() => true,
    }
}

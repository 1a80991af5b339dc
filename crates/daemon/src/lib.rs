// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Sensor daemons and the supervisory layer that discovers hardware,
//! instantiates the matching daemon, and applies restart policy on
//! failure — §4.3, §4.4, §4.5.

pub mod base;
pub mod error;
pub mod manager;
pub mod sensors;
pub mod serial;

pub use base::{probe_with_timeout, Daemon, DaemonCtx, PROBE_TIMEOUT, STOP_TIMEOUT};
pub use error::{DaemonError, SerialPortError};
pub use manager::{AdaptiveDaemonManager, DiscoveredDevice, HardwareDiscovery};
pub use serial::{SerialLease, SerialPortManager};

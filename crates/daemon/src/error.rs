// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use thiserror::Error;

/// Failures a [`crate::base::Daemon`] surfaces from `initialize` or
/// `run`. Matches the §7 taxonomy's `HardwareAbsent`/`HardwareTransient`/
/// `ProtocolError` kinds as they apply to a single daemon instance;
/// `Configuration` failures are handled above this layer since they are
/// process-fatal rather than per-daemon.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DaemonError {
    #[error("required hardware is not present: {0}")]
    HardwareAbsent(String),

    #[error("transient hardware error: {0}")]
    HardwareTransient(String),

    #[error("probe timed out after {0:?}")]
    ProbeTimeout(std::time::Duration),

    #[error("malformed payload from peripheral: {0}")]
    Protocol(String),
}

/// Failures from [`crate::serial::SerialPortManager`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerialPortError {
    #[error("serial port {0:?} is already held by another daemon")]
    AlreadyHeld(PathBuf),

    #[error("serial port {0:?} was not held by the releasing daemon")]
    NotHeldByCaller(PathBuf),
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide arbiter for exclusive serial-port access — §4.4's
//! "Serial-port arbitration" note and the Flipper Zero's mutual
//! exclusion requirement.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aura_core::DaemonId;
use parking_lot::Mutex;

use crate::error::SerialPortError;

/// A handle returned by [`SerialPortManager::acquire`]. Dropping it
/// without calling [`SerialPortManager::release`] does **not** release
/// the port automatically — §4.4 requires daemons to release
/// explicitly on stop, so a leaked handle is a bug the manager's
/// supervision should surface via a stuck-daemon restart, not a silent
/// `Drop` impl papering over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLease {
    pub path: PathBuf,
    pub holder: DaemonId,
}

#[derive(Default)]
pub struct SerialPortManager {
    held: Mutex<HashMap<PathBuf, DaemonId>>,
}

impl SerialPortManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive access to `path` for `holder`. A double-acquire
    /// (by any daemon, including the current holder) returns
    /// `AlreadyHeld`; the caller must degrade gracefully rather than
    /// open the device anyway.
    pub fn acquire(&self, path: &Path, holder: DaemonId) -> Result<SerialLease, SerialPortError> {
        let mut held = self.held.lock();
        if held.contains_key(path) {
            return Err(SerialPortError::AlreadyHeld(path.to_path_buf()));
        }
        held.insert(path.to_path_buf(), holder);
        Ok(SerialLease { path: path.to_path_buf(), holder })
    }

    /// Release a previously acquired lease. Releasing a path the caller
    /// doesn't actually hold is rejected rather than silently revoking
    /// another daemon's lease.
    pub fn release(&self, lease: &SerialLease) -> Result<(), SerialPortError> {
        let mut held = self.held.lock();
        match held.get(&lease.path) {
            Some(holder) if *holder == lease.holder => {
                held.remove(&lease.path);
                Ok(())
            }
            _ => Err(SerialPortError::NotHeldByCaller(lease.path.clone())),
        }
    }

    pub fn is_held(&self, path: &Path) -> bool {
        self.held.lock().contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_frees_the_port_for_another_holder() {
        let mgr = SerialPortManager::new();
        let path = PathBuf::from("/dev/ttyACM0");
        let a = DaemonId::new();
        let b = DaemonId::new();

        let lease = mgr.acquire(&path, a).unwrap();
        assert!(mgr.acquire(&path, b).is_err());
        mgr.release(&lease).unwrap();
        assert!(mgr.acquire(&path, b).is_ok());
    }

    #[test]
    fn double_acquire_by_the_same_daemon_is_still_rejected() {
        let mgr = SerialPortManager::new();
        let path = PathBuf::from("/dev/ttyACM0");
        let a = DaemonId::new();
        let _lease = mgr.acquire(&path, a).unwrap();
        assert_eq!(mgr.acquire(&path, a), Err(SerialPortError::AlreadyHeld(path)));
    }

    #[test]
    fn releasing_a_port_you_do_not_hold_is_rejected() {
        let mgr = SerialPortManager::new();
        let path = PathBuf::from("/dev/ttyACM0");
        let a = DaemonId::new();
        let b = DaemonId::new();
        mgr.acquire(&path, a).unwrap();
        let forged = SerialLease { path: path.clone(), holder: b };
        assert!(mgr.release(&forged).is_err());
        assert!(mgr.is_held(&path));
    }
}

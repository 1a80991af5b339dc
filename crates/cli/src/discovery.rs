// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup hardware discovery for `aurad` — §6 of `AdaptiveDaemonManager`.
//!
//! Real USB/I2C/PCIe/audio enumeration is an external collaborator
//! (§1); this is the one fixed discovery pass a companion device with a
//! known, non-hotpluggable sensor set actually needs. It runs once:
//! every onboard sensor is reported immediately, and the serial-attached
//! Flipper Zero (if configured) is reported only when its port mapping
//! is present.

use std::path::PathBuf;

use aura_core::Capability;
use aura_daemon::{DiscoveredDevice, HardwareDiscovery};

/// Synthetic device paths for onboard sensors that don't have a real
/// bus address worth modeling — uniqueness against
/// `AdaptiveDaemonManager`'s `(category, device_path)` dedup key is all
/// that matters here.
pub struct OnboardDiscovery {
    serial_port_mapping: std::collections::HashMap<String, PathBuf>,
    reported: bool,
}

impl OnboardDiscovery {
    pub fn new(serial_port_mapping: std::collections::HashMap<String, PathBuf>) -> Self {
        Self { serial_port_mapping, reported: false }
    }
}

impl HardwareDiscovery for OnboardDiscovery {
    fn discover(&mut self) -> Vec<DiscoveredDevice> {
        if self.reported {
            return vec![];
        }
        self.reported = true;

        let mut devices = vec![
            DiscoveredDevice { capability: Capability::WifiAdapter, device_path: PathBuf::from("onboard/wifi0") },
            DiscoveredDevice {
                capability: Capability::BluetoothAdapter,
                device_path: PathBuf::from("onboard/bluetooth0"),
            },
            DiscoveredDevice {
                capability: Capability::HardwareMonitor,
                device_path: PathBuf::from("onboard/hwmon0"),
            },
            DiscoveredDevice { capability: Capability::Imu, device_path: PathBuf::from("onboard/imu0") },
            DiscoveredDevice { capability: Capability::AudioInput, device_path: PathBuf::from("onboard/audio0") },
            DiscoveredDevice {
                capability: Capability::EnvironmentSensor,
                device_path: PathBuf::from("onboard/environment0"),
            },
            DiscoveredDevice { capability: Capability::Camera, device_path: PathBuf::from("onboard/camera0") },
        ];

        if let Some(path) = self.serial_port_mapping.get("flipper_zero") {
            devices.push(DiscoveredDevice { capability: Capability::FlipperZero, device_path: path.clone() });
        }

        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_onboard_sensors_exactly_once() {
        let mut discovery = OnboardDiscovery::new(std::collections::HashMap::new());
        let first = discovery.discover();
        assert_eq!(first.len(), 7);
        assert!(discovery.discover().is_empty());
    }

    #[test]
    fn flipper_zero_is_reported_only_when_mapped() {
        let mut mapping = std::collections::HashMap::new();
        mapping.insert("flipper_zero".to_string(), PathBuf::from("/dev/ttyACM0"));
        let mut discovery = OnboardDiscovery::new(mapping);
        let devices = discovery.discover();
        assert!(devices.iter().any(|d| d.capability == Capability::FlipperZero));
    }
}

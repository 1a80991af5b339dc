// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon identity, capability, and lifecycle-state types.
//!
//! A [`DaemonDescriptor`] is the manager's handle on a running daemon: who it
//! is, what hardware it needs, how it restarts, and where it currently sits
//! in its state machine. The descriptor itself never runs anything — see
//! `aura-daemon::base::Daemon` for the trait that does.

use std::time::Duration;

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies one running daemon instance.
    pub struct DaemonId("dmn-");
}

/// A hardware or software capability a sensor daemon depends on.
///
/// Produced by hardware discovery, consumed by the manager to decide which
/// daemons to instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    WifiAdapter,
    BluetoothAdapter,
    HardwareMonitor,
    Imu,
    AudioInput,
    EnvironmentSensor,
    FlipperZero,
    Camera,
    /// Anything hardware discovery can name but that core does not model a
    /// daemon for yet. Logged, never instantiated.
    Unknown(String),
}

/// How a daemon manager responds to repeated failures of one daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Never,
    /// Restart up to `k` times within a rolling 10-minute window.
    OnFailure(u32),
    Always,
}

/// Lifecycle state of a daemon, as observed by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaemonState {
    Init,
    Running,
    Degraded,
    Stopped,
    Failed,
}

crate::simple_display! {
    DaemonState {
        Init => "init",
        Running => "running",
        Degraded => "degraded",
        Stopped => "stopped",
        Failed => "failed",
    }
}

/// Static identity and policy for one daemon instance, held by the manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonDescriptor {
    pub id: DaemonId,
    pub category: crate::reading::Category,
    pub required_capabilities: Vec<Capability>,
    #[serde(with = "duration_ms")]
    pub default_interval: Duration,
    pub restart_policy: RestartPolicy,
    pub state: DaemonState,
}

impl DaemonDescriptor {
    pub fn new(
        category: crate::reading::Category,
        required_capabilities: Vec<Capability>,
        default_interval: Duration,
        restart_policy: RestartPolicy,
    ) -> Self {
        Self {
            id: DaemonId::new(),
            category,
            required_capabilities,
            default_interval,
            restart_policy,
            state: DaemonState::Init,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sensor readings: the unit of data a sensor daemon hands to the world
//! state and, optionally, announces over the event bus.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::descriptor::DaemonId;
use crate::world::Value;

/// An open string tag naming a sensor domain (`"wifi"`, `"environment"`,
/// `"rf.sub_ghz"`, ...). Kept as an open set rather than a closed enum since
/// the manager may encounter categories for devices the core doesn't ship a
/// daemon for yet.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(SmolStr);

impl Category {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::borrow::Borrow<str> for Category {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// A single, immutable, time-stamped observation from one sensor daemon.
///
/// Readings are the payload a daemon writes into [`crate::world::WorldState`];
/// they are never themselves stored — only their [`Value`] is, under a
/// WorldState key the daemon owns.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub category: Category,
    pub source: DaemonId,
    pub value: Value,
    pub at: Instant,
}

impl SensorReading {
    pub fn new(category: Category, source: DaemonId, value: Value, at: Instant) -> Self {
        Self { category, source, value, at }
    }
}

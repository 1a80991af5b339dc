// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event model published on the event bus.
//!
//! `aura-core` owns the [`Event`] type itself; the bus that queues,
//! prioritizes, and fans it out to subscribers lives in `aura-eventbus` so
//! that this crate doesn't need an async runtime dependency just to
//! describe what an event looks like.

mod dispatch;

use serde::{Deserialize, Serialize};

use crate::descriptor::DaemonId;
use crate::reading::Category;

/// Severity ordering for events. Derived `Ord` relies on declaration order,
/// so `Critical` must stay last — `Critical > High > Normal > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Closed set of event kinds the core itself ever publishes.
///
/// Sensor daemons and the manager only ever construct one of these; there
/// is no open/custom variant because, unlike `WorldState` values, events
/// are always produced by core-owned code, never forwarded from a
/// peripheral's raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InitStarted,
    InitFailed,
    Running,
    Degraded,
    Stopped,
    HardwareAdded,
    HardwareRemoved,
    WifiChanged,
    SlowFrame,
    FallbackEntered,
    FallbackEscalated,
    RestartExhausted,
    CriticalQueueViolation,
}

/// A typed, prioritized, categorized message published on the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub category: Category,
    pub kind: EventKind,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    pub at_epoch_ms: u64,
    pub source: DaemonId,
}

impl Event {
    pub fn new(
        category: Category,
        kind: EventKind,
        priority: Priority,
        source: DaemonId,
        at_epoch_ms: u64,
    ) -> Self {
        Self { category, kind, priority, payload: serde_json::Value::Null, at_epoch_ms, source }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn name(&self) -> &'static str {
        dispatch::name(self.kind)
    }

    pub fn log_summary(&self) -> String {
        dispatch::log_summary(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_critical_above_everything() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn event_round_trips_through_json() {
        let e = Event::new(
            Category::new("hardware_monitor"),
            EventKind::HardwareAdded,
            Priority::Normal,
            DaemonId::new(),
            1_700_000_000_000,
        );
        let json = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, EventKind::HardwareAdded);
        assert_eq!(back.category, e.category);
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::sync::Arc;

use crate::descriptor::DaemonId;
use crate::event::{Event, EventKind, Priority};
use crate::reading::Category;
use crate::{Clock, FakeClock, WorldState};

/// A `WorldState` backed by a `FakeClock`, plus the clock itself so a test
/// can advance time and observe TTL expiry deterministically.
pub fn world_state_with_fake_clock() -> (WorldState, Arc<FakeClock>) {
    let clock = Arc::new(FakeClock::new());
    (WorldState::new(clock.clone()), clock)
}

pub fn running_event(category: &str, source: DaemonId) -> Event {
    Event::new(Category::new(category), EventKind::Running, Priority::Normal, source, 1_000_000)
}

pub fn init_failed_event(category: &str, source: DaemonId, reason: &str) -> Event {
    Event::new(Category::new(category), EventKind::InitFailed, Priority::High, source, 1_000_000)
        .with_payload(serde_json::json!({ "reason": reason }))
}

pub fn hardware_added_event(category: &str, source: DaemonId, device_path: &str) -> Event {
    Event::new(
        Category::new(category),
        EventKind::HardwareAdded,
        Priority::Normal,
        source,
        1_000_000,
    )
    .with_payload(serde_json::json!({ "device_path": device_path }))
}

pub fn restart_exhausted_event(category: &str, source: DaemonId) -> Event {
    Event::new(
        Category::new(category),
        EventKind::RestartExhausted,
        Priority::High,
        source,
        1_000_000,
    )
}

pub fn slow_frame_event(source: DaemonId, elapsed_ms: f64) -> Event {
    Event::new(Category::new("loop"), EventKind::SlowFrame, Priority::Normal, source, 1_000_000)
        .with_payload(serde_json::json!({ "elapsed_ms": elapsed_ms }))
}

/// Proptest strategies for core value/event types.
#[cfg(feature = "proptest")]
pub mod strategies {
    use crate::event::Priority;
    use proptest::prelude::*;

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![
            Just(Priority::Low),
            Just(Priority::Normal),
            Just(Priority::High),
            Just(Priority::Critical),
        ]
    }
}

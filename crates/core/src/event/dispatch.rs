// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind name and log-summary helpers, kept out of `mod.rs` so the enum
//! definition stays readable as the kind set grows.

use super::{Event, EventKind};

pub(super) fn name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::InitStarted => "daemon:init_started",
        EventKind::InitFailed => "daemon:init_failed",
        EventKind::Running => "daemon:running",
        EventKind::Degraded => "daemon:degraded",
        EventKind::Stopped => "daemon:stopped",
        EventKind::HardwareAdded => "hardware:added",
        EventKind::HardwareRemoved => "hardware:removed",
        EventKind::WifiChanged => "wifi:changed",
        EventKind::SlowFrame => "loop:slow_frame",
        EventKind::FallbackEntered => "inference:fallback_entered",
        EventKind::FallbackEscalated => "inference:fallback_escalated",
        EventKind::RestartExhausted => "daemon:restart_exhausted",
        EventKind::CriticalQueueViolation => "eventbus:critical_queue_violation",
    }
}

pub(super) fn log_summary(event: &Event) -> String {
    format!(
        "{} category={} source={} priority={:?}",
        name(event.kind),
        event.category,
        event.source,
        event.priority
    )
}

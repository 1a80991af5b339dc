// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The fixed-cadence visualization loop and its WebSocket broadcast
//! sink — §4.9, §4.10.

pub mod broadcast;
pub mod loop_;

pub use broadcast::{BroadcastSink, DEFAULT_BIND};
pub use loop_::{FrameSink, TickTimings, VisualizationLoop};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Priority, category-filtered async pub/sub for [`aura_core::Event`].
//!
//! A single [`EventBus`] worker drains a priority queue and fans events out
//! to subscribers over bounded channels — callback-style subscribers are
//! deliberately not supported; message passing through `tokio::sync::mpsc`
//! is what makes cancellation (dropping the receiver) and isolation (one
//! slow subscriber can't block another) trivial.

mod bus;

pub use bus::{EventBus, Subscription};

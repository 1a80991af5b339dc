// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats for the companion's external interfaces.
//!
//! Two distinct protocols live here, deliberately kept apart per §4.10 and
//! §6: particle frames are a fixed binary header plus a raw float32
//! payload, never JSON; state-update and IPC control messages are JSON
//! with a required `type` field, never binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod frame;
pub mod ipc;
pub mod state_update;

pub use frame::{decode_frame, encode_frame, FrameDecodeError, FRAME_MAGIC, FRAME_VERSION};
pub use ipc::{read_message, write_message, ProtocolError};
pub use state_update::{parse_state_update, StateUpdate};

#[cfg(test)]
mod property_tests;

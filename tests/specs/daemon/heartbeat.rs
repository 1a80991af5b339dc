// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.11, §12: the heartbeat file is refreshed at least once a second
//! while `aurad` is running, and stops moving once it exits.

use std::time::Duration;

use crate::prelude::*;

#[test]
fn heartbeat_advances_while_running() {
    let fixture = Fixture::new();
    let config_path = fixture.write_default_config();
    let bind = test_bind(20);
    let aurad = Aurad::spawn(&config_path, bind, &[]);
    let heartbeat_path = fixture.heartbeat_path();

    let first = wait_until(Duration::from_secs(5), || read_heartbeat_epoch_ms(&heartbeat_path).is_some());
    assert!(first, "heartbeat file never appeared");
    let first_value = read_heartbeat_epoch_ms(&heartbeat_path).unwrap();

    let advanced = wait_until(Duration::from_secs(5), || {
        read_heartbeat_epoch_ms(&heartbeat_path).map(|v| v > first_value).unwrap_or(false)
    });
    assert!(advanced, "heartbeat file never advanced past its first value");

    drop(aurad);
}

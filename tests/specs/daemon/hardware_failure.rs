// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §13: resources the process cannot run without (here, the broadcast
//! socket) fail at exit code 3, distinct from the config-error code 2.

use crate::prelude::*;

#[test]
fn broadcast_bind_conflict_exits_3() {
    let fixture = Fixture::new();
    let config_path = fixture.write_default_config();
    let bind = test_bind(30);

    // Hold the port open so aurad's own bind attempt fails.
    let _listener = std::net::TcpListener::bind(bind).expect("failed to reserve test port");

    let aurad = Aurad::spawn(&config_path, bind, &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(3));
}

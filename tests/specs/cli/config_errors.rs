// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup error taxonomy (§7, §13): configuration problems must fail
//! fast with exit code 2, before any daemon or socket is touched.

use crate::prelude::*;

#[test]
fn missing_config_file_exits_2() {
    let fixture = Fixture::new();
    let missing = fixture.path("does-not-exist.toml");
    let aurad = Aurad::spawn(&missing, test_bind(0), &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn malformed_toml_exits_2() {
    let fixture = Fixture::new();
    let config_path = fixture.path("config.toml");
    std::fs::write(&config_path, "this is not valid toml {{{").unwrap();
    let aurad = Aurad::spawn(&config_path, test_bind(1), &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn out_of_range_target_fps_exits_2() {
    let fixture = Fixture::new();
    let config_path = fixture.write_config("target_fps = 0\n");
    let aurad = Aurad::spawn(&config_path, test_bind(2), &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn zero_particle_count_exits_2() {
    let fixture = Fixture::new();
    let config_path = fixture.write_config("particle_count = 0\n");
    let aurad = Aurad::spawn(&config_path, test_bind(3), &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn alpha_out_of_range_exits_2() {
    let fixture = Fixture::new();
    let config_path = fixture.write_config("interpolation_alpha = 1.5\n");
    let aurad = Aurad::spawn(&config_path, test_bind(4), &[]);
    let status = aurad.wait();
    assert_eq!(status.code(), Some(2));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures and a thin `aurad`-spawning helper for the specs in
//! this binary. Kept deliberately small: most coverage lives in each
//! crate's own `#[cfg(test)]` modules, so these tests only need to
//! drive the compiled binary and read back its externally-visible
//! effects (exit code, heartbeat file, WebSocket frames).

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

/// A disposable fixture directory holding a generated `config.toml` and
/// a `heartbeat` path, torn down on drop.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("failed to create fixture tempdir") }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.path("heartbeat")
    }

    /// Writes a config file. Every field not mentioned in `extra_toml`
    /// keeps `aura_core::Config`'s default — see
    /// `crates/core/src/config.rs`'s `#[serde(default)]`.
    pub fn write_config(&self, extra_toml: &str) -> PathBuf {
        let config_path = self.path("config.toml");
        let heartbeat = self.heartbeat_path();
        let body = format!("heartbeat_path = {heartbeat:?}\n{extra_toml}\n");
        std::fs::write(&config_path, body).expect("failed to write fixture config");
        config_path
    }

    /// Writes a config file with no overrides beyond the heartbeat path.
    pub fn write_default_config(&self) -> PathBuf {
        self.write_config("")
    }
}

/// A spawned `aurad` child, killed on drop so a failed assertion never
/// leaks a background process into the next test.
pub struct Aurad {
    child: std::process::Child,
}

impl Aurad {
    pub fn spawn(config: &Path, bind: SocketAddr, extra_args: &[&str]) -> Self {
        let mut cmd = Command::cargo_bin("aurad").expect("aurad binary not built");
        cmd.arg("--config")
            .arg(config)
            .arg("--bind")
            .arg(bind.to_string())
            .arg("--headless")
            .args(extra_args);
        let child = cmd.spawn().expect("failed to spawn aurad");
        Self { child }
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Blocks until the process exits (with a generous ceiling — these
    /// are only used for processes expected to exit fast on their own,
    /// e.g. a bad-config startup failure).
    pub fn wait(mut self) -> std::process::ExitStatus {
        self.child.wait().expect("failed to wait on aurad child")
    }
}

impl Drop for Aurad {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Polls `predicate` every 20ms until it returns `true` or `timeout`
/// elapses. Returns whether it succeeded.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    loop {
        if predicate() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Reads the heartbeat file's raw epoch-millisecond contents, if present
/// and parseable — mirrors `aura_companion::heartbeat::age`'s own parse.
pub fn read_heartbeat_epoch_ms(path: &Path) -> Option<u128> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// A fixed, test-local port. Tests run within one process (not one per
/// binary), so each spec that binds a real socket gets its own offset
/// to avoid racing another spec for the same address.
pub fn test_bind(offset: u16) -> SocketAddr {
    format!("127.0.0.1:{}", 19_100 + offset).parse().expect("valid socket addr")
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Out-of-process supervisor mode (`aurad --supervise`) — §4.11, §12.
//!
//! Spawns the monitored `aurad` process (the same binary, invoked
//! without `--supervise`), watches its heartbeat file, and restarts it
//! with exponential backoff if the heartbeat goes stale. Follows the same
//! lock-file discipline as single-instance startup guards — acquire by
//! writing, never silently steal — but applied to watching an external
//! process instead of guarding one process's own startup.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::heartbeat;

/// Restart attempts are capped within this rolling window — §12:
/// "exponential backoff capped at 5 attempts per 10 minutes."
const BACKOFF_WINDOW: Duration = Duration::from_secs(600);
const MAX_ATTEMPTS_PER_WINDOW: u32 = 5;
const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Grace period between SIGTERM and SIGKILL when replacing a stale
/// child — mirrors `aura-daemon`'s `STOP_TIMEOUT` cooperative-shutdown
/// budget rather than inventing a new constant.
const TERM_GRACE: Duration = Duration::from_secs(3);

pub struct SupervisorArgs {
    pub heartbeat_path: PathBuf,
    pub heartbeat_timeout: Duration,
    pub child_args: Vec<String>,
}

/// Runs forever: spawn the child, poll its heartbeat, restart on
/// staleness or exit, until the backoff budget for the rolling window
/// is exhausted (at which point the supervisor gives up and returns an
/// error so `main` can exit non-zero).
pub async fn run(args: SupervisorArgs) -> anyhow::Result<()> {
    let mut attempts: Vec<std::time::Instant> = Vec::new();

    loop {
        prune_old_attempts(&mut attempts);
        if attempts.len() as u32 >= MAX_ATTEMPTS_PER_WINDOW {
            anyhow::bail!(
                "supervised process restarted {} times in the last {}s; giving up",
                attempts.len(),
                BACKOFF_WINDOW.as_secs()
            );
        }

        let backoff = backoff_for(attempts.len() as u32);
        if !attempts.is_empty() {
            info!(backoff_s = backoff.as_secs(), "waiting before restarting supervised process");
            tokio::time::sleep(backoff).await;
        }

        attempts.push(std::time::Instant::now());
        let mut child = spawn_child(&args.child_args)?;
        info!(pid = child.id(), "supervisor started monitored process");

        let exit_reason = watch(&mut child, &args.heartbeat_path, args.heartbeat_timeout).await;
        match exit_reason {
            ExitReason::ProcessExited(status) => {
                warn!(?status, "supervised process exited; restarting");
            }
            ExitReason::HeartbeatStale(age) => {
                warn!(age_s = age.as_secs(), "supervised process heartbeat went stale; restarting");
                terminate(&mut child).await;
            }
        }
    }
}

enum ExitReason {
    ProcessExited(Option<std::process::ExitStatus>),
    HeartbeatStale(Duration),
}

async fn watch(child: &mut Child, heartbeat_path: &std::path::Path, timeout: Duration) -> ExitReason {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            status = child.wait() => {
                return ExitReason::ProcessExited(status.map_err(|err| {
                    error!(error = %err, "failed to read monitored process exit status");
                }).ok());
            }
            _ = interval.tick() => {
                if let Some(age) = heartbeat::age(heartbeat_path) {
                    if age > timeout {
                        return ExitReason::HeartbeatStale(age);
                    }
                }
            }
        }
    }
}

fn spawn_child(args: &[String]) -> anyhow::Result<Child> {
    let exe = std::env::current_exe()?;
    Ok(Command::new(exe).args(args).stdin(Stdio::null()).spawn()?)
}

/// Cooperative shutdown first (SIGTERM), escalating to SIGKILL if the
/// child hasn't exited within `TERM_GRACE` — the same pattern
/// `AdaptiveDaemonManager::stop_all` applies to its own daemons, here
/// applied one level up to a whole process.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let pid = Pid::from_raw(pid as i32);
        if let Err(err) = signal::kill(pid, Signal::SIGTERM) {
            warn!(error = %err, "failed to send SIGTERM to supervised process");
        }
    }
    if tokio::time::timeout(TERM_GRACE, child.wait()).await.is_err() {
        warn!("supervised process did not exit after SIGTERM; killing");
        let _ = child.kill().await;
    }
}

fn backoff_for(attempt: u32) -> Duration {
    let secs = 2u64.saturating_pow(attempt).min(60);
    Duration::from_secs(secs)
}

fn prune_old_attempts(attempts: &mut Vec<std::time::Instant>) {
    let now = std::time::Instant::now();
    attempts.retain(|at| now.saturating_duration_since(*at) <= BACKOFF_WINDOW);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_then_caps() {
        assert_eq!(backoff_for(0), Duration::from_secs(1));
        assert_eq!(backoff_for(1), Duration::from_secs(2));
        assert_eq!(backoff_for(10), Duration::from_secs(60));
    }

    #[test]
    fn prune_removes_attempts_older_than_the_window() {
        let mut attempts = vec![std::time::Instant::now() - Duration::from_secs(700)];
        prune_old_attempts(&mut attempts);
        assert!(attempts.is_empty());
    }
}

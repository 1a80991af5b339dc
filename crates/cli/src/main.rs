// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `aurad` — the companion binary that wires the real-time control
//! plane together and drives it at `target_fps`, plus the standalone
//! `--supervise` watchdog mode — §0, §12, §13.

mod discovery;
mod exit_error;
mod heartbeat;
mod supervisor;
mod wiring;

use std::net::SocketAddr;
use std::path::PathBuf;

use aura_core::Config;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use exit_error::ExitError;

#[derive(Parser, Debug)]
#[command(name = "aurad", about = "On-device AI companion real-time control plane")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "/etc/aura/config.toml")]
    config: PathBuf,

    /// Address the particle broadcast WebSocket server binds to.
    #[arg(long, default_value = "0.0.0.0:8765")]
    bind: SocketAddr,

    /// Disable the voice-input conversation bridge key (§14) — voice
    /// I/O itself is out of core scope; this only controls whether the
    /// core wires up the corresponding WorldState keys.
    #[arg(long)]
    no_voice_input: bool,

    /// Disable the voice-output conversation bridge key (§14).
    #[arg(long)]
    no_voice_output: bool,

    /// Run with no interactive/voice surface at all.
    #[arg(long)]
    headless: bool,

    /// Append `{timestamp, feature_vector}` rows to this file every
    /// tick for offline model retraining (§15).
    #[arg(long)]
    record_dataset: Option<PathBuf>,

    /// Run as the external supervisor instead of the control plane
    /// itself: spawns and watches a child `aurad` process, restarting
    /// it on heartbeat staleness (§12).
    #[arg(long)]
    supervise: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            error!(code = err.code, "{}", err.message);
            err.code
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<(), ExitError> {
    let mut config = Config::load(&cli.config).map_err(|err| ExitError::config(err.to_string()))?;
    config.no_voice_input = cli.no_voice_input;
    config.no_voice_output = cli.no_voice_output;
    config.headless = cli.headless;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|err| ExitError::hardware(format!("failed to start async runtime: {err}")))?;

    if cli.supervise {
        let child_args = reconstruct_child_args(&cli);
        let heartbeat_timeout = std::time::Duration::from_secs_f64(config.heartbeat_timeout_s);
        return runtime
            .block_on(supervisor::run(supervisor::SupervisorArgs {
                heartbeat_path: config.heartbeat_path.clone(),
                heartbeat_timeout,
                child_args,
            }))
            .map_err(|err| ExitError::hardware(err.to_string()));
    }

    runtime.block_on(run_companion(config, cli.bind, cli.record_dataset))
}

/// Rebuilds the argument list the supervisor hands to the process it
/// spawns — the same flags minus `--supervise`, read back from the
/// parsed `Cli` rather than the raw `env::args()` so the child always
/// gets a normalized, validated invocation.
fn reconstruct_child_args(cli: &Cli) -> Vec<String> {
    let mut args = vec![
        "--config".to_string(),
        cli.config.display().to_string(),
        "--bind".to_string(),
        cli.bind.to_string(),
    ];
    if cli.no_voice_input {
        args.push("--no-voice-input".to_string());
    }
    if cli.no_voice_output {
        args.push("--no-voice-output".to_string());
    }
    if cli.headless {
        args.push("--headless".to_string());
    }
    if let Some(path) = &cli.record_dataset {
        args.push("--record-dataset".to_string());
        args.push(path.display().to_string());
    }
    args
}

async fn run_companion(config: Config, bind: SocketAddr, record_dataset: Option<PathBuf>) -> Result<(), ExitError> {
    let companion = wiring::build(&config, bind, record_dataset)?;
    let shutdown = companion.cancel.clone();

    let heartbeat_cancel = CancellationToken::new();
    let heartbeat_task =
        tokio::spawn(heartbeat::run(config.heartbeat_path.clone(), heartbeat_cancel.clone()));

    let signal_task = tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    info!(bind = %bind, target_fps = config.target_fps, "aurad starting");
    companion.run().await?;

    heartbeat_cancel.cancel();
    let _ = heartbeat_task.await;
    signal_task.abort();
    info!("aurad stopped");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM, whichever comes first, then requests
/// cooperative shutdown — the same `CancellationToken` every sensor
/// daemon and the visualization loop already select over.
async fn wait_for_shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                cancel.cancel();
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    cancel.cancel();
}

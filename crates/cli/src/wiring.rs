// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every core crate into one running process — §0 crate map,
//! §4.5, §4.9, §4.10, §4.11.
//!
//! This is the only place that knows about every concrete sensor
//! daemon, the inference backend, and the broadcast sink at once; every
//! other crate only knows the seams it depends on.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aura_core::{Capability, Category, Config, RestartPolicy, SystemClock, WorldState};
use aura_daemon::sensors::{
    audio_level::{AudioLevelDaemon, NoAudioInput},
    bluetooth::{BluetoothDaemon, NoBluetoothAdapter},
    environment::{EnvironmentDaemon, NoEnvironmentSensors},
    flipper::{FlipperDaemon, NoFlipper},
    hardware_monitor::{HardwareMonitorDaemon, NoDeviceEnumerator},
    imu::{ImuDaemon, NoImu},
    vision::{NoVisionBackend, VisionDaemon},
    wifi::{NoWifiAdapter, WifiDaemon},
};
use aura_daemon::{AdaptiveDaemonManager, SerialPortManager};
use aura_eventbus::EventBus;
use aura_inference::engine::NoAccelerator;
use aura_inference::{DatasetRecorder, InferenceEngine, SystemProbeCache};
use aura_viz::{BroadcastSink, VisualizationLoop};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::exit_error::ExitError;

/// Register the factory for every onboard sensor capability this
/// companion device ships with. Discovery (`crate::discovery`) only
/// ever reports devices for capabilities registered here; anything else
/// is logged and skipped by the manager itself (§4.5).
fn register_sensor_daemons(manager: &mut AdaptiveDaemonManager, serial_ports: Arc<SerialPortManager>, config: &Config) {
    manager.register(Capability::WifiAdapter, Category::new("wifi"), RestartPolicy::OnFailure(5), || {
        Box::new(WifiDaemon::new(NoWifiAdapter))
    });
    manager.register(Capability::BluetoothAdapter, Category::new("bluetooth"), RestartPolicy::OnFailure(5), || {
        Box::new(BluetoothDaemon::new(NoBluetoothAdapter))
    });
    manager.register(Capability::HardwareMonitor, Category::new("hardware_monitor"), RestartPolicy::Always, || {
        Box::new(HardwareMonitorDaemon::new(NoDeviceEnumerator))
    });
    manager.register(Capability::Imu, Category::new("imu"), RestartPolicy::OnFailure(5), || {
        Box::new(ImuDaemon::new(NoImu))
    });
    manager.register(Capability::AudioInput, Category::new("audio"), RestartPolicy::OnFailure(5), || {
        Box::new(AudioLevelDaemon::new(NoAudioInput))
    });
    manager.register(Capability::EnvironmentSensor, Category::new("environment"), RestartPolicy::OnFailure(5), || {
        Box::new(EnvironmentDaemon::new(NoEnvironmentSensors))
    });
    manager.register(Capability::Camera, Category::new("vision"), RestartPolicy::OnFailure(3), || {
        Box::new(VisionDaemon::new(NoVisionBackend))
    });

    let flipper_path: PathBuf =
        config.serial_port_mapping.get("flipper_zero").cloned().unwrap_or_else(|| PathBuf::from("/dev/ttyACM0"));
    manager.register(Capability::FlipperZero, Category::new("flipper"), RestartPolicy::OnFailure(5), move || {
        Box::new(FlipperDaemon::new(NoFlipper, serial_ports.clone(), flipper_path.clone()))
    });
}

/// Everything the main loop needs after startup, so `main` can just run
/// the tick loop and the heartbeat writer until shutdown is requested.
pub struct Companion {
    pub manager: AdaptiveDaemonManager,
    pub viz_loop: VisualizationLoop<NoAccelerator, BroadcastSink>,
    pub broadcast_bind: SocketAddr,
    pub broadcast: BroadcastSink,
    pub cancel: CancellationToken,
}

/// Build every component and perform the one-shot hardware discovery
/// pass. Returns [`ExitError`] with exit code 3 if a resource this
/// process cannot run without fails to initialize (§13).
pub fn build(config: &Config, broadcast_bind: SocketAddr, dataset_path: Option<PathBuf>) -> Result<Companion, ExitError> {
    let clock = Arc::new(SystemClock);
    let world = Arc::new(WorldState::new(clock.clone()));
    let events = EventBus::new();
    let cancel = CancellationToken::new();

    let serial_ports = Arc::new(SerialPortManager::new());
    let mut manager = AdaptiveDaemonManager::new(world.clone(), events.clone(), clock.clone());
    register_sensor_daemons(&mut manager, serial_ports, config);

    let mut discovery = crate::discovery::OnboardDiscovery::new(config.serial_port_mapping.clone());
    let spawned = manager.discover_and_spawn(&mut discovery);
    info!(spawned, "sensor daemons started from hardware discovery");

    let mut engine = InferenceEngine::new(NoAccelerator, config);
    match engine.load() {
        Ok(report) => info!(?report, "inference engine loaded"),
        Err(err) => warn!(error = %err, "inference engine starting in fallback mode"),
    }

    let probe = SystemProbeCache::new(
        Arc::new(aura_inference::probe::LinuxSystemProbe::new(num_cpus_hint())),
        clock.clone(),
        config.feature_cache_ttl,
    );

    let broadcast = BroadcastSink::new();
    let mut viz_loop =
        VisualizationLoop::new(world, events, clock, probe, engine, broadcast.clone(), config);

    if let Some(path) = dataset_path {
        match DatasetRecorder::create(&path) {
            Ok(recorder) => {
                info!(path = %path.display(), "dataset recording enabled");
                viz_loop = viz_loop.with_recorder(recorder);
            }
            Err(err) => warn!(error = %err, path = %path.display(), "failed to open dataset recorder; continuing without it"),
        }
    }

    Ok(Companion { manager, viz_loop, broadcast_bind, broadcast, cancel })
}

/// Rough divisor for the CPU-load probe; a real deployment would read
/// this from `/proc/cpuinfo`, but the companion's target device is a
/// fixed single-board computer so a constant is good enough (§4.6 only
/// requires the fraction be "normalized... where that makes sense").
fn num_cpus_hint() -> f32 {
    4.0
}

impl Companion {
    /// Run the broadcast server and the visualization tick loop side by
    /// side until `cancel` fires, then stop every sensor daemon.
    pub async fn run(self) -> Result<(), ExitError> {
        let Companion { manager, viz_loop, broadcast_bind, broadcast, cancel } = self;

        let listener = tokio::net::TcpListener::bind(broadcast_bind)
            .await
            .map_err(|err| ExitError::hardware(format!("failed to bind broadcast socket {broadcast_bind}: {err}")))?;

        let serve_cancel = cancel.clone();
        let router = broadcast.router();
        let server = tokio::spawn(async move {
            tokio::select! {
                result = axum::serve(listener, router) => {
                    if let Err(err) = result {
                        warn!(error = %err, "broadcast server exited with an error");
                    }
                }
                _ = serve_cancel.cancelled() => {}
            }
        });

        viz_loop.run(cancel).await;
        server.abort();
        manager.stop_all().await;
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fixed-cadence scheduler — §4.9.
//!
//! Every tick walks the same five steps in order: snapshot, extract,
//! infer, interpolate, broadcast. None of the four in-process steps can
//! block on I/O; only the broadcast step touches the network, and it is
//! fire-and-forget so a slow client never holds up the next tick.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use aura_core::{Category, Clock, Config, DaemonId, Event, EventKind, Priority, WorldState};
use aura_eventbus::EventBus;
use aura_inference::engine::AcceleratorBackend;
use aura_inference::{InferenceEngine, ParticleInterpolator, SystemProbeCache};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Ring buffer of the last `N` ticks' timings, used for
/// `metrics_report_interval_s`-cadence summary logging (§4.9).
struct RollingWindow<const N: usize> {
    buf: VecDeque<Duration>,
}

impl<const N: usize> RollingWindow<N> {
    fn new() -> Self {
        Self { buf: VecDeque::with_capacity(N) }
    }

    fn push(&mut self, total: Duration) {
        if self.buf.len() == N {
            self.buf.pop_front();
        }
        self.buf.push_back(total);
    }

    fn p50(&self) -> Duration {
        if self.buf.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted: Vec<Duration> = self.buf.iter().copied().collect();
        sorted.sort();
        sorted[sorted.len() / 2]
    }
}

/// A per-tick destination for the interpolated particle positions.
/// `BroadcastSink` (`crate::broadcast`) is the production implementation;
/// tests use an in-memory collector.
pub trait FrameSink: Send + Sync {
    fn publish(&self, positions: &[[f32; 3]], seq: u64, generated_at_epoch_ms: u64);
}

/// Per-tick component timings, returned from [`VisualizationLoop::tick`]
/// mainly so tests can assert on them directly.
#[derive(Debug, Clone, Copy)]
pub struct TickTimings {
    pub snapshot: Duration,
    pub extract: Duration,
    pub infer: Duration,
    pub interpolate: Duration,
    pub broadcast: Duration,
    pub total: Duration,
}

pub struct VisualizationLoop<B: AcceleratorBackend, S: FrameSink> {
    id: DaemonId,
    world: Arc<WorldState>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    probe: SystemProbeCache,
    engine: InferenceEngine<B>,
    interpolator: ParticleInterpolator,
    sink: S,
    period: Duration,
    slow_frame_threshold_ms: f64,
    metrics_report_interval: Duration,
    seq: u64,
    consecutive_fallback_ticks: u32,
    window: RollingWindow<300>,
    last_metrics_report: Instant,
    recorder: Option<aura_inference::DatasetRecorder>,
}

impl<B: AcceleratorBackend, S: FrameSink> VisualizationLoop<B, S> {
    pub fn new(
        world: Arc<WorldState>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        probe: SystemProbeCache,
        engine: InferenceEngine<B>,
        sink: S,
        config: &Config,
    ) -> Self {
        Self {
            id: DaemonId::new(),
            world,
            events,
            clock,
            probe,
            engine,
            interpolator: ParticleInterpolator::new(config.interpolation_alpha),
            sink,
            period: config.frame_period(),
            slow_frame_threshold_ms: config.slow_frame_threshold_ms,
            metrics_report_interval: Duration::from_secs_f64(config.metrics_report_interval_s),
            seq: 0,
            consecutive_fallback_ticks: 0,
            window: RollingWindow::new(),
            last_metrics_report: Instant::now(),
            recorder: None,
        }
    }

    /// Append one `{timestamp, feature_vector}` row per tick to
    /// `recorder` — opt-in offline dataset capture (§15), never read
    /// back by the core at runtime.
    pub fn with_recorder(mut self, recorder: aura_inference::DatasetRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Run one full snapshot→extract→infer→interpolate→broadcast cycle.
    pub fn tick(&mut self) -> TickTimings {
        let tick_start = Instant::now();

        let t = Instant::now();
        let snapshot = self.world.get_snapshot();
        let snapshot_dt = t.elapsed();

        let t = Instant::now();
        let sample = self.probe.sample();
        let features = aura_inference::extract(&snapshot, &sample);
        let extract_dt = t.elapsed();

        if let Some(recorder) = self.recorder.as_mut() {
            let now_epoch_ms = self.clock.epoch_ms();
            if let Err(err) = recorder.record(now_epoch_ms, &features, None) {
                warn!(error = %err, "dataset recorder write failed; disabling further recording");
                self.recorder = None;
            }
        }

        let was_available = self.engine.available();
        let t = Instant::now();
        let now_epoch_ms = self.clock.epoch_ms();
        let raw = self.engine.infer(&features);
        let infer_dt = t.elapsed();

        let t = Instant::now();
        let positions = self.interpolator.step(raw);
        let interpolate_dt = t.elapsed();

        let t = Instant::now();
        self.sink.publish(positions, self.seq, now_epoch_ms);
        let broadcast_dt = t.elapsed();

        self.seq += 1;
        let total = tick_start.elapsed();

        if was_available && !self.engine.available() {
            self.publish_event(EventKind::FallbackEntered, Priority::Normal, None);
        }

        if self.engine.available() {
            self.consecutive_fallback_ticks = 0;
        } else {
            self.consecutive_fallback_ticks += 1;
            if self.consecutive_fallback_ticks == 3 {
                self.publish_event(EventKind::FallbackEscalated, Priority::High, None);
            }
        }

        let timings =
            TickTimings { snapshot: snapshot_dt, extract: extract_dt, infer: infer_dt, interpolate: interpolate_dt, broadcast: broadcast_dt, total };
        self.window.push(total);

        let total_ms = total.as_secs_f64() * 1000.0;
        if total_ms > self.slow_frame_threshold_ms {
            warn!(elapsed_ms = total_ms, budget_ms = self.slow_frame_threshold_ms, "slow frame");
            self.publish_event(
                EventKind::SlowFrame,
                Priority::Normal,
                Some(serde_json::json!({ "elapsed_ms": total_ms })),
            );
        }

        self.maybe_report_metrics();

        timings
    }

    fn publish_event(&self, kind: EventKind, priority: Priority, payload: Option<serde_json::Value>) {
        let mut event = Event::new(Category::new("viz"), kind, priority, self.id, self.clock.epoch_ms());
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        self.events.publish(event);
    }

    fn maybe_report_metrics(&mut self) {
        if self.last_metrics_report.elapsed() < self.metrics_report_interval {
            return;
        }
        self.last_metrics_report = Instant::now();
        info!(
            p50_ms = self.window.p50().as_secs_f64() * 1000.0,
            available = self.engine.available(),
            seq = self.seq,
            "visualization loop tick summary"
        );
    }

    /// Drive ticks on a fixed-period `tokio::time::interval` until
    /// `cancel` fires. Uses `MissedTickBehavior::Skip` so an overrun
    /// tick is never followed by a catch-up burst (§4.9, §8 S3).
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick();
                }
                _ = cancel.cancelled() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::test_support::world_state_with_fake_clock;
    use aura_inference::engine::NoAccelerator;
    use aura_inference::probe::fake::FakeSystemProbe;
    use aura_inference::probe::ProbeSample;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        frames: Mutex<Vec<(Vec<[f32; 3]>, u64)>>,
    }

    impl FrameSink for Arc<CollectingSink> {
        fn publish(&self, positions: &[[f32; 3]], seq: u64, _generated_at_epoch_ms: u64) {
            self.frames.lock().push((positions.to_vec(), seq));
        }
    }

    fn build(config: &Config) -> (VisualizationLoop<NoAccelerator, Arc<CollectingSink>>, Arc<CollectingSink>) {
        let (world, clock) = world_state_with_fake_clock();
        let world = Arc::new(world);
        let events = EventBus::new();
        let probe = SystemProbeCache::new(
            Arc::new(FakeSystemProbe::new(ProbeSample { cpu_load: 0.1, mem_used: 0.2, cpu_temp_c: 0.0 })),
            clock.clone(),
            Duration::from_millis(100),
        );
        let engine = InferenceEngine::new(NoAccelerator, config);
        let sink = Arc::new(CollectingSink::default());
        let viz_loop = VisualizationLoop::new(world, events, clock, probe, engine, sink.clone(), config);
        (viz_loop, sink)
    }

    #[test]
    fn tick_publishes_a_frame_with_the_configured_particle_count() {
        let mut config = Config::default();
        config.particle_count = 16;
        let (mut viz_loop, sink) = build(&config);
        viz_loop.tick();
        let frames = sink.frames.lock();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0.len(), 16);
    }

    #[test]
    fn sequence_number_increments_each_tick() {
        let config = Config::default();
        let (mut viz_loop, sink) = build(&config);
        viz_loop.tick();
        viz_loop.tick();
        let frames = sink.frames.lock();
        assert_eq!(frames[0].1, 0);
        assert_eq!(frames[1].1, 1);
    }

    #[test]
    fn no_accelerator_backend_still_produces_finite_positions() {
        let config = Config::default();
        let (mut viz_loop, sink) = build(&config);
        viz_loop.tick();
        let frames = sink.frames.lock();
        assert!(frames[0].0.iter().all(|p| p.iter().all(|c| c.is_finite())));
    }
}

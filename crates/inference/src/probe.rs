// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-cached system probe (CPU/memory), the one I/O `FeatureExtractor` is
//! allowed per §4.6: "No I/O except for a bounded, TTL-cached system probe
//! ... with TTL ≥100 ms."

use std::sync::Arc;
use std::time::{Duration, Instant};

use aura_core::Clock;
use parking_lot::Mutex;

/// A single CPU/memory reading, already normalized to `[0, 1]` fractions
/// where that makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbeSample {
    pub cpu_load: f32,
    pub mem_used: f32,
    pub cpu_temp_c: f32,
}

/// Seam for reading host CPU/memory state. Real reads come from
/// `/proc/loadavg` and `/proc/meminfo`; tests inject a fixed sample.
pub trait SystemProbe: Send + Sync {
    fn sample(&self) -> ProbeSample;
}

/// Reads `/proc/loadavg` and `/proc/meminfo` on Linux. Every parse failure
/// is swallowed into a zeroed sample — a missing probe is a neutral
/// default, never a panic or a stalled extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSystemProbe {
    /// Divisor used to turn a raw one-minute load average into a `[0,1]`
    /// fraction; chosen relative to expected core counts on the target
    /// device rather than queried at runtime.
    pub load_divisor: f32,
}

impl LinuxSystemProbe {
    pub fn new(load_divisor: f32) -> Self {
        Self { load_divisor }
    }
}

impl SystemProbe for LinuxSystemProbe {
    fn sample(&self) -> ProbeSample {
        let cpu_load = read_loadavg()
            .map(|one_min| (one_min / self.load_divisor.max(0.001)).clamp(0.0, 1.0))
            .unwrap_or(0.0);
        let mem_used = read_mem_used_fraction().unwrap_or(0.0);
        ProbeSample { cpu_load, mem_used, cpu_temp_c: 0.0 }
    }
}

fn read_loadavg() -> Option<f32> {
    let text = std::fs::read_to_string("/proc/loadavg").ok()?;
    text.split_whitespace().next()?.parse::<f32>().ok()
}

fn read_mem_used_fraction() -> Option<f32> {
    let text = std::fs::read_to_string("/proc/meminfo").ok()?;
    let mut total_kb = None;
    let mut available_kb = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            total_kb = rest.trim().trim_end_matches(" kB").parse::<f64>().ok();
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            available_kb = rest.trim().trim_end_matches(" kB").parse::<f64>().ok();
        }
    }
    let (total, available) = (total_kb?, available_kb?);
    if total <= 0.0 {
        return None;
    }
    Some(((total - available) / total).clamp(0.0, 1.0) as f32)
}

/// Wraps a [`SystemProbe`] with a TTL so repeated calls within one frame
/// budget don't re-read `/proc` — configurable, but never below 100 ms per
/// the §4.6 contract.
pub struct SystemProbeCache {
    probe: Arc<dyn SystemProbe>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cached: Mutex<Option<(Instant, ProbeSample)>>,
}

impl SystemProbeCache {
    pub fn new(probe: Arc<dyn SystemProbe>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let ttl = ttl.max(Duration::from_millis(100));
        Self { probe, clock, ttl, cached: Mutex::new(None) }
    }

    pub fn sample(&self) -> ProbeSample {
        let now = self.clock.now();
        let mut cached = self.cached.lock();
        if let Some((taken_at, sample)) = *cached {
            if now.saturating_duration_since(taken_at) < self.ttl {
                return sample;
            }
        }
        let sample = self.probe.sample();
        *cached = Some((now, sample));
        sample
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::{ProbeSample, SystemProbe};
    use parking_lot::Mutex;

    #[derive(Default)]
    pub struct FakeSystemProbe {
        sample: Mutex<ProbeSample>,
    }

    impl FakeSystemProbe {
        pub fn new(sample: ProbeSample) -> Self {
            Self { sample: Mutex::new(sample) }
        }

        pub fn set(&self, sample: ProbeSample) {
            *self.sample.lock() = sample;
        }
    }

    impl SystemProbe for FakeSystemProbe {
        fn sample(&self) -> ProbeSample {
            *self.sample.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeSystemProbe;
    use super::*;
    use aura_core::FakeClock;

    #[test]
    fn cache_returns_same_sample_within_ttl() {
        let probe = Arc::new(FakeSystemProbe::new(ProbeSample { cpu_load: 0.2, ..Default::default() }));
        let clock = Arc::new(FakeClock::new());
        let cache = SystemProbeCache::new(probe.clone(), clock.clone(), Duration::from_millis(200));

        let first = cache.sample();
        probe.set(ProbeSample { cpu_load: 0.9, ..Default::default() });
        let second = cache.sample();
        assert_eq!(first, second);

        clock.advance(Duration::from_millis(250));
        let third = cache.sample();
        assert_eq!(third.cpu_load, 0.9);
    }

    #[test]
    fn ttl_is_floored_at_100ms() {
        let probe = Arc::new(FakeSystemProbe::default());
        let clock = Arc::new(FakeClock::new());
        let cache = SystemProbeCache::new(probe, clock, Duration::from_millis(1));
        assert!(cache.ttl >= Duration::from_millis(100));
    }
}

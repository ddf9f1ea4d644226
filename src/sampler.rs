//! Effective frequency and C-state residency from APERF/MPERF deltas
//!
//! Each CPU carries a [`Baseline`] (P0 frequency plus the last counter
//! pair). A tick turns the counter deltas over the elapsed wall-clock
//! window into a [`SampleResult`] and moves the baseline forward.
//!
//! MPERF only ticks in C0, at the P0 rate, so `max_freq (kHz) * elapsed (ms)`
//! is the number of MPERF ticks a fully busy core would produce. The
//! shortfall is time spent in sleep states.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::attribute::{AttributeStore, SysfsStore};
use crate::counters::{CounterPair, CounterSource, MsrCounterSource};
use crate::error::{CpufreqError, Result};
use crate::policy::{CpuId, FrequencyKHz};
use crate::repository::PolicyRepository;

/// Right shift applied to both deltas when `aperf * 100` could overflow
const OVERFLOW_SHIFT: u32 = 7;

/// Per-CPU measurement baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub max_freq: FrequencyKHz,
    pub last: CounterPair,
}

/// Sampling state of one CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuState {
    #[default]
    Uninitialized,
    Valid(Baseline),
    /// Initial acquisition or a later counter read failed
    Invalid,
}

/// Time split between C0 and sleep states over one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Residency {
    pub active_time: Duration,
    pub sleep_time: Duration,
    /// 0-100
    pub active_percent: u32,
}

/// Result of one tick for one CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleResult {
    pub average_freq: FrequencyKHz,
    pub active_time: Duration,
    pub sleep_time: Duration,
    pub active_percent: u32,
    /// MPERF did not advance, so no frequency could be derived
    pub counter_stall: bool,
}

/// Average effective frequency over a window
///
/// Returns `None` when the (possibly shifted) MPERF delta is zero.
pub fn average_frequency(
    max_freq: FrequencyKHz,
    aperf_diff: u64,
    mperf_diff: u64,
) -> Option<FrequencyKHz> {
    let (aperf_diff, mperf_diff) = if aperf_diff > u64::MAX / 100 {
        (aperf_diff >> OVERFLOW_SHIFT, mperf_diff >> OVERFLOW_SHIFT)
    } else {
        (aperf_diff, mperf_diff)
    };

    if mperf_diff == 0 {
        return None;
    }

    let percent = (aperf_diff * 100) / mperf_diff;
    let average = u128::from(max_freq) * u128::from(percent) / 100;
    Some(FrequencyKHz::try_from(average).unwrap_or(FrequencyKHz::MAX))
}

/// C0/Cx split of `elapsed` given the MPERF delta and P0 frequency
pub fn residency(elapsed: Duration, mperf_diff: u64, max_freq: FrequencyKHz) -> Residency {
    let overall_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    let expected_ticks = max_freq.saturating_mul(overall_ms);

    if expected_ticks == 0 {
        return Residency::default();
    }

    let percent = u128::from(mperf_diff) * 100 / u128::from(expected_ticks);
    // mperf_diff > expected_ticks only on a counter anomaly; sleep clamps to 0
    let sleep_ms = expected_ticks.saturating_sub(mperf_diff) / max_freq;
    let active_ms = mperf_diff / max_freq;

    Residency {
        active_time: Duration::from_millis(active_ms),
        sleep_time: Duration::from_millis(sleep_ms),
        active_percent: percent.min(100) as u32,
    }
}

/// Combine both derivations for one counter delta
///
/// A stall means MPERF did not move at all. Large deltas whose MPERF part
/// vanishes under the overflow shift report 0 kHz but keep their residency.
pub fn derive_sample(max_freq: FrequencyKHz, delta: CounterPair, elapsed: Duration) -> SampleResult {
    let split = residency(elapsed, delta.mperf, max_freq);

    SampleResult {
        average_freq: average_frequency(max_freq, delta.aperf, delta.mperf).unwrap_or(0),
        active_time: split.active_time,
        sleep_time: split.sleep_time,
        active_percent: split.active_percent,
        counter_stall: delta.mperf == 0,
    }
}

/// Tracks baselines for a set of CPUs and produces samples from them
pub struct PerformanceSampler<C = MsrCounterSource, S = SysfsStore> {
    counters: C,
    repository: PolicyRepository<S>,
    states: BTreeMap<CpuId, CpuState>,
}

impl<C: CounterSource, S: AttributeStore> PerformanceSampler<C, S> {
    pub fn new(counters: C, repository: PolicyRepository<S>) -> Self {
        Self {
            counters,
            repository,
            states: BTreeMap::new(),
        }
    }

    pub fn repository(&self) -> &PolicyRepository<S> {
        &self.repository
    }

    pub fn counters(&self) -> &C {
        &self.counters
    }

    pub fn state(&self, cpu: CpuId) -> CpuState {
        self.states.get(&cpu).copied().unwrap_or_default()
    }

    pub fn is_valid(&self, cpu: CpuId) -> bool {
        matches!(self.state(cpu), CpuState::Valid(_))
    }

    /// Read the P0 frequency and a first counter pair for `cpu`
    ///
    /// On failure the CPU is marked [`CpuState::Invalid`].
    pub fn initialize(&mut self, cpu: CpuId) -> Result<()> {
        match self.acquire(cpu) {
            Ok(baseline) => {
                tracing::debug!(cpu, max_freq = baseline.max_freq, "counter baseline acquired");
                self.states.insert(cpu, CpuState::Valid(baseline));
                Ok(())
            }
            Err(err) => {
                self.states.insert(cpu, CpuState::Invalid);
                Err(err)
            }
        }
    }

    fn acquire(&self, cpu: CpuId) -> Result<Baseline> {
        let limits = self
            .repository
            .get_hardware_limits(cpu)
            .map_err(|_| CpufreqError::Unsupported(cpu))?;
        let last = self.counters.read_pair(cpu)?;
        Ok(Baseline {
            max_freq: limits.max,
            last,
        })
    }

    /// Derive a sample from `now` and advance the baseline to it
    pub fn tick(&mut self, cpu: CpuId, now: CounterPair, elapsed: Duration) -> Result<SampleResult> {
        let baseline = match self.states.get_mut(&cpu) {
            Some(CpuState::Valid(baseline)) => baseline,
            _ => {
                return Err(CpufreqError::InvalidArgument(format!(
                    "CPU {} has no valid counter baseline",
                    cpu
                )))
            }
        };

        let delta = now.delta_since(&baseline.last);
        baseline.last = now;
        Ok(derive_sample(baseline.max_freq, delta, elapsed))
    }

    /// Read the counters of a valid CPU and tick it
    ///
    /// A failed read invalidates the CPU so the caller can retry
    /// initialization later.
    pub fn sample(&mut self, cpu: CpuId, elapsed: Duration) -> Result<SampleResult> {
        if !self.is_valid(cpu) {
            return Err(CpufreqError::InvalidArgument(format!(
                "CPU {} has no valid counter baseline",
                cpu
            )));
        }

        match self.counters.read_pair(cpu) {
            Ok(now) => self.tick(cpu, now, elapsed),
            Err(err) => {
                self.states.insert(cpu, CpuState::Invalid);
                Err(err)
            }
        }
    }
}

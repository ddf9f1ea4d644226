//! Periodic sampling of one CPU or the whole logical CPU set
//!
//! A single thread walks every monitored CPU in order once per interval.
//! The stop flag is only looked at between passes, so a pass that has
//! started always covers every CPU.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::attribute::{AttributeStore, SysfsStore};
use crate::config::MonitorConfig;
use crate::counters::{CounterSource, MsrCounterSource};
use crate::error::{CpufreqError, Result};
use crate::policy::CpuId;
use crate::repository::PolicyRepository;
use crate::sampler::{CpuState, PerformanceSampler, SampleResult};

/// Outcome for one CPU in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuReading {
    Sample(SampleResult),
    /// Counters unavailable; shown as `[offline]`
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuReport {
    pub cpu: CpuId,
    pub reading: CpuReading,
}

pub struct SamplingLoop<C = MsrCounterSource, S = SysfsStore> {
    sampler: PerformanceSampler<C, S>,
    cpus: Vec<CpuId>,
    interval: Duration,
    once: bool,
}

impl SamplingLoop {
    /// Build a loop over the real (or configured fake) control surfaces
    ///
    /// Resolves the CPU selection: the requested CPU must exist, and
    /// "all" means every CPU enumerated under the sysfs root.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        let repository = PolicyRepository::new(config.attribute_store());

        let cpus = match config.cpu {
            Some(cpu) if repository.cpu_exists(cpu) => vec![cpu],
            Some(cpu) => return Err(CpufreqError::not_found(cpu, "cpu")),
            None => repository.cpus()?,
        };

        if cpus.is_empty() {
            return Err(CpufreqError::InvalidArgument(format!(
                "no CPUs found under {}",
                config.sysfs_root.display()
            )));
        }

        let sampler = PerformanceSampler::new(config.counter_source(), repository);
        Ok(Self::new(sampler, cpus, config.interval, config.once))
    }
}

impl<C: CounterSource, S: AttributeStore> SamplingLoop<C, S> {
    pub fn new(
        sampler: PerformanceSampler<C, S>,
        cpus: Vec<CpuId>,
        interval: Duration,
        once: bool,
    ) -> Self {
        Self {
            sampler,
            cpus,
            interval,
            once,
        }
    }

    pub fn cpus(&self) -> &[CpuId] {
        &self.cpus
    }

    pub fn sampler(&self) -> &PerformanceSampler<C, S> {
        &self.sampler
    }

    /// Acquire baselines for every CPU that has none yet
    ///
    /// Failures are returned per CPU; the CPUs stay [`CpuState::Invalid`]
    /// and do not affect the others.
    pub fn initialize(&mut self) -> Vec<(CpuId, CpufreqError)> {
        let mut failures = Vec::new();
        for &cpu in &self.cpus {
            if self.sampler.state(cpu) != CpuState::Uninitialized {
                continue;
            }
            if let Err(err) = self.sampler.initialize(cpu) {
                tracing::warn!(cpu, error = %err, "CPU excluded from sampling");
                failures.push((cpu, err));
            }
        }
        failures
    }

    /// One sequential pass over every monitored CPU
    ///
    /// Valid CPUs are ticked. Invalid CPUs get a single re-initialization
    /// attempt and are reported offline for this pass either way.
    pub fn run_pass(&mut self, elapsed: Duration) -> Vec<CpuReport> {
        let mut reports = Vec::with_capacity(self.cpus.len());

        for &cpu in &self.cpus {
            let reading = if self.sampler.is_valid(cpu) {
                match self.sampler.sample(cpu, elapsed) {
                    Ok(sample) => CpuReading::Sample(sample),
                    Err(err) => {
                        tracing::warn!(cpu, error = %err, "lost counter access");
                        CpuReading::Offline
                    }
                }
            } else {
                match self.sampler.initialize(cpu) {
                    Ok(()) => tracing::info!(cpu, "counters available again"),
                    Err(err) => tracing::debug!(cpu, error = %err, "still offline"),
                }
                CpuReading::Offline
            };

            reports.push(CpuReport { cpu, reading });
        }

        reports
    }

    /// Sample every `interval` until `stop` is set, or once
    ///
    /// `stop` is checked before and after each sleep, never mid-pass.
    /// `on_pass` receives each pass's reports; its error ends the loop.
    /// Returns the number of completed passes.
    pub fn run<E, F>(&mut self, stop: &AtomicBool, mut on_pass: F) -> std::result::Result<u64, E>
    where
        F: FnMut(&[CpuReport]) -> std::result::Result<(), E>,
    {
        self.initialize();

        let mut last = Instant::now();
        let mut passes = 0;

        loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }

            thread::sleep(self.interval);
            // a stop requested mid-sleep must not print another pass
            if stop.load(Ordering::Relaxed) {
                break;
            }

            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;

            let reports = self.run_pass(elapsed);
            passes += 1;
            on_pass(&reports)?;

            if self.once {
                break;
            }
        }

        Ok(passes)
    }
}

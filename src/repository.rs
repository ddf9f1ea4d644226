//! Per-CPU scaling policy operations over an [`AttributeStore`]
//!
//! Reads follow the "unknown is zero" convention at the value layer:
//! [`PolicyRepository::read_value`] returns 0 for anything unreadable, and
//! the composite getters turn a zero into an explicit `NotFound`.
//!
//! Writes done by [`PolicyRepository::set_policy`] are not transactional.
//! If the min or governor write fails, the max write that preceded it
//! stays in effect and the caller sees the first error.

use crate::attribute::{Attribute, AttributeStore, SysfsStore};
use crate::codec;
use crate::error::{CpufreqError, Result};
use crate::policy::{
    CpuId, CpuPolicy, FrequencyKHz, GovernorName, HardwareLimits, USERSPACE_GOVERNOR,
};

/// Typed view of one machine's cpufreq control surface
#[derive(Debug, Clone, Default)]
pub struct PolicyRepository<S = SysfsStore> {
    store: S,
}

impl<S: AttributeStore> PolicyRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cpu_exists(&self, cpu: CpuId) -> bool {
        self.store.cpu_exists(cpu)
    }

    /// Logical CPU set known to the control surface
    pub fn cpus(&self) -> Result<Vec<CpuId>> {
        self.store.cpus()
    }

    /// Numeric attribute value, or 0 if it cannot be opened, read or parsed
    pub fn read_value(&self, cpu: CpuId, which: Attribute) -> FrequencyKHz {
        self.store
            .read(cpu, which)
            .and_then(|text| codec::parse_uint(&text))
            .unwrap_or(0)
    }

    /// Trimmed string attribute, or None if missing, unreadable or empty
    fn read_string(&self, cpu: CpuId, which: Attribute) -> Option<String> {
        let text = self.store.read(cpu, which).ok()?;
        let value = codec::decode_string(&text);
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    /// Frequency the kernel believes the CPU runs at (`scaling_cur_freq`), 0 if unknown
    pub fn get_freq_kernel(&self, cpu: CpuId) -> FrequencyKHz {
        self.read_value(cpu, Attribute::ScalingCurFreq)
    }

    /// Frequency read back from the hardware (`cpuinfo_cur_freq`), 0 if unknown
    pub fn get_freq_hardware(&self, cpu: CpuId) -> FrequencyKHz {
        self.read_value(cpu, Attribute::CpuinfoCurFreq)
    }

    pub fn get_hardware_limits(&self, cpu: CpuId) -> Result<HardwareLimits> {
        let min = self.read_value(cpu, Attribute::CpuinfoMinFreq);
        if min == 0 {
            return Err(CpufreqError::not_found(cpu, Attribute::CpuinfoMinFreq.name()));
        }
        let max = self.read_value(cpu, Attribute::CpuinfoMaxFreq);
        if max == 0 {
            return Err(CpufreqError::not_found(cpu, Attribute::CpuinfoMaxFreq.name()));
        }
        Ok(HardwareLimits { min, max })
    }

    pub fn get_driver(&self, cpu: CpuId) -> Result<String> {
        self.read_string(cpu, Attribute::ScalingDriver)
            .ok_or_else(|| CpufreqError::not_found(cpu, Attribute::ScalingDriver.name()))
    }

    /// Active governor exactly as the kernel reports it
    pub fn get_governor(&self, cpu: CpuId) -> Result<String> {
        self.read_string(cpu, Attribute::ScalingGovernor)
            .ok_or_else(|| CpufreqError::not_found(cpu, Attribute::ScalingGovernor.name()))
    }

    /// Fails with `NotFound` when a bound is unknown or the reported governor
    /// is not a name that could be written back
    pub fn get_policy(&self, cpu: CpuId) -> Result<CpuPolicy> {
        let governor = self.get_governor(cpu)?;
        let governor = GovernorName::new(&governor)
            .map_err(|_| CpufreqError::not_found(cpu, Attribute::ScalingGovernor.name()))?;

        let min = self.read_value(cpu, Attribute::ScalingMinFreq);
        let max = self.read_value(cpu, Attribute::ScalingMaxFreq);
        if min == 0 || max == 0 {
            return Err(CpufreqError::not_found(cpu, "scaling_min_freq/scaling_max_freq"));
        }

        Ok(CpuPolicy { governor, min, max })
    }

    fn read_list(&self, cpu: CpuId, which: Attribute) -> Result<String> {
        self.store.read(cpu, which).map_err(|err| match err {
            CpufreqError::ParseError { .. } => err,
            _ => CpufreqError::not_found(cpu, which.name()),
        })
    }

    pub fn get_available_governors(&self, cpu: CpuId) -> Result<Vec<String>> {
        let text = self.read_list(cpu, Attribute::ScalingAvailableGovernors)?;
        codec::parse_governor_list(&text)
    }

    pub fn get_available_frequencies(&self, cpu: CpuId) -> Result<Vec<FrequencyKHz>> {
        let text = self.read_list(cpu, Attribute::ScalingAvailableFrequencies)?;
        codec::parse_frequency_list(&text)
    }

    /// CPUs that share `cpu`'s scaling domain
    pub fn get_affected_cpus(&self, cpu: CpuId) -> Result<Vec<CpuId>> {
        let text = self.read_list(cpu, Attribute::AffectedCpus)?;
        codec::parse_cpu_list(&text)
    }

    pub fn set_governor(&self, cpu: CpuId, name: &str) -> Result<()> {
        let governor = codec::validate_governor(name)?;
        self.store
            .write(cpu, Attribute::ScalingGovernor, governor.as_str())
    }

    pub fn set_min(&self, cpu: CpuId, freq: FrequencyKHz) -> Result<()> {
        self.store
            .write(cpu, Attribute::ScalingMinFreq, &codec::encode_uint(freq))
    }

    pub fn set_max(&self, cpu: CpuId, freq: FrequencyKHz) -> Result<()> {
        self.store
            .write(cpu, Attribute::ScalingMaxFreq, &codec::encode_uint(freq))
    }

    /// Write max, then min, then governor; stops at the first failure
    pub fn set_policy(&self, cpu: CpuId, policy: &CpuPolicy) -> Result<()> {
        if !policy.is_ordered() {
            return Err(CpufreqError::InvalidArgument(format!(
                "policy max {} kHz is below min {} kHz",
                policy.max, policy.min
            )));
        }

        self.set_max(cpu, policy.max)?;
        self.set_min(cpu, policy.min)?;
        self.store
            .write(cpu, Attribute::ScalingGovernor, policy.governor.as_str())
    }

    /// Request a fixed frequency through `scaling_setspeed`
    ///
    /// Switches the CPU to the `userspace` governor first when another one
    /// is active, since only that governor honours setspeed writes.
    pub fn set_target_frequency(&self, cpu: CpuId, freq: FrequencyKHz) -> Result<()> {
        let governor = self.get_governor(cpu)?;

        if governor != USERSPACE_GOVERNOR {
            tracing::info!(
                cpu,
                from = governor.as_str(),
                to = USERSPACE_GOVERNOR,
                "switching governor for target frequency request"
            );
            self.set_governor(cpu, USERSPACE_GOVERNOR)?;
        }

        self.store
            .write(cpu, Attribute::ScalingSetspeed, &codec::encode_uint(freq))
    }
}

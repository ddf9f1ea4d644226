//! Monitor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::attribute::{SysfsStore, DEFAULT_SYSFS_ROOT};
use crate::counters::{MsrCounterSource, DEFAULT_MSR_ROOT};
use crate::output::OutputFormat;
use crate::policy::CpuId;

/// Settings for one monitoring session
///
/// # Example
/// ```
/// use cpufreq_aperf::config::MonitorConfig;
///
/// let config = MonitorConfig::default();
/// assert_eq!(config.interval.as_secs(), 1);
/// assert!(config.cpu.is_none());
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between two passes
    pub interval: Duration,

    /// Restrict sampling to one CPU (None = every CPU in the namespace)
    pub cpu: Option<CpuId>,

    /// Stop after the first pass
    pub once: bool,

    /// Directory holding the `cpuN/cpufreq` trees
    pub sysfs_root: PathBuf,

    /// Directory holding the `N/msr` devices
    pub msr_root: PathBuf,

    pub format: OutputFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            cpu: None,
            once: false,
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            msr_root: PathBuf::from(DEFAULT_MSR_ROOT),
            format: OutputFormat::Text,
        }
    }
}

impl MonitorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.interval.is_zero() && !self.once {
            return Err("interval must be at least 1 second unless --once is given".to_string());
        }

        if self.sysfs_root.as_os_str().is_empty() {
            return Err("sysfs root must not be empty".to_string());
        }

        if self.msr_root.as_os_str().is_empty() {
            return Err("msr root must not be empty".to_string());
        }

        Ok(())
    }

    /// True when counters come from the real msr devices
    pub fn uses_hardware_counters(&self) -> bool {
        self.msr_root == PathBuf::from(DEFAULT_MSR_ROOT)
    }

    pub fn attribute_store(&self) -> SysfsStore {
        SysfsStore::new(&self.sysfs_root)
    }

    pub fn counter_source(&self) -> MsrCounterSource {
        MsrCounterSource::new(&self.msr_root)
    }
}

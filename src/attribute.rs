//! Per-CPU access to the cpufreq attribute namespace
//!
//! The real backend is sysfs (`/sys/devices/system/cpu/cpuN/cpufreq/<name>`);
//! the root is configurable so the same code runs against a fake tree.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{CpufreqError, Result};
use crate::policy::CpuId;

/// Default location of the per-CPU directories
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// String attributes at least this long are treated as unreadable
pub const MAX_ATTRIBUTE_LEN: usize = 256;

/// Named cpufreq attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    CpuinfoCurFreq,
    CpuinfoMinFreq,
    CpuinfoMaxFreq,
    ScalingCurFreq,
    ScalingMinFreq,
    ScalingMaxFreq,
    ScalingDriver,
    ScalingGovernor,
    ScalingAvailableGovernors,
    ScalingAvailableFrequencies,
    AffectedCpus,
    ScalingSetspeed,
}

impl Attribute {
    /// File name under `cpuN/cpufreq/`
    pub fn name(self) -> &'static str {
        match self {
            Attribute::CpuinfoCurFreq => "cpuinfo_cur_freq",
            Attribute::CpuinfoMinFreq => "cpuinfo_min_freq",
            Attribute::CpuinfoMaxFreq => "cpuinfo_max_freq",
            Attribute::ScalingCurFreq => "scaling_cur_freq",
            Attribute::ScalingMinFreq => "scaling_min_freq",
            Attribute::ScalingMaxFreq => "scaling_max_freq",
            Attribute::ScalingDriver => "scaling_driver",
            Attribute::ScalingGovernor => "scaling_governor",
            Attribute::ScalingAvailableGovernors => "scaling_available_governors",
            Attribute::ScalingAvailableFrequencies => "scaling_available_frequencies",
            Attribute::AffectedCpus => "affected_cpus",
            Attribute::ScalingSetspeed => "scaling_setspeed",
        }
    }

    /// Only these accept writes
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            Attribute::ScalingMinFreq
                | Attribute::ScalingMaxFreq
                | Attribute::ScalingGovernor
                | Attribute::ScalingSetspeed
        )
    }
}

/// Read/write access to single attribute values of one CPU
pub trait AttributeStore {
    /// True when the CPU exists in the namespace; never fails
    fn cpu_exists(&self, cpu: CpuId) -> bool;

    /// Raw attribute text, including any trailing newline
    fn read(&self, cpu: CpuId, attr: Attribute) -> Result<String>;

    /// Replace an attribute value
    fn write(&self, cpu: CpuId, attr: Attribute, value: &str) -> Result<()>;

    /// Logical CPUs present in the namespace, ascending
    fn cpus(&self) -> Result<Vec<CpuId>>;
}

/// sysfs-backed attribute store
#[derive(Debug, Clone)]
pub struct SysfsStore {
    root: PathBuf,
}

impl Default for SysfsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cpu_dir(&self, cpu: CpuId) -> PathBuf {
        self.root.join(format!("cpu{}", cpu))
    }

    /// Path of one attribute file
    pub fn attribute_path(&self, cpu: CpuId, attr: Attribute) -> PathBuf {
        self.cpu_dir(cpu).join("cpufreq").join(attr.name())
    }

    fn map_io(cpu: CpuId, op: &str, attr: Attribute, err: io::Error) -> CpufreqError {
        if err.kind() == io::ErrorKind::NotFound {
            CpufreqError::not_found(cpu, attr.name())
        } else {
            CpufreqError::IoFailure {
                op: format!("{} {}", op, attr.name()),
                cpu,
                source: err,
            }
        }
    }
}

/// `cpu12` -> 12; anything else (cpufreq, cpuidle, cpu1a) -> None
fn parse_cpu_dir_name(name: &str) -> Option<CpuId> {
    let digits = name.strip_prefix("cpu")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl AttributeStore for SysfsStore {
    fn cpu_exists(&self, cpu: CpuId) -> bool {
        self.cpu_dir(cpu).is_dir()
    }

    fn read(&self, cpu: CpuId, attr: Attribute) -> Result<String> {
        let path = self.attribute_path(cpu, attr);
        let text = fs::read_to_string(&path).map_err(|e| Self::map_io(cpu, "read", attr, e))?;
        if text.len() >= MAX_ATTRIBUTE_LEN && !is_list(attr) {
            return Err(CpufreqError::parse(
                format!("{} (value too long)", attr.name()),
                format!("{} bytes", text.len()),
            ));
        }
        Ok(text)
    }

    fn write(&self, cpu: CpuId, attr: Attribute, value: &str) -> Result<()> {
        if !attr.is_writable() {
            return Err(CpufreqError::InvalidArgument(format!(
                "{} is read-only",
                attr.name()
            )));
        }

        let path = self.attribute_path(cpu, attr);
        tracing::debug!(cpu, attribute = attr.name(), value, "writing cpufreq attribute");

        // sysfs ignores O_TRUNC; regular files (test trees) need it
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Self::map_io(cpu, "open", attr, e))?;
        file.write_all(value.as_bytes())
            .map_err(|e| Self::map_io(cpu, "write", attr, e))
    }

    fn cpus(&self) -> Result<Vec<CpuId>> {
        let entries = fs::read_dir(&self.root).map_err(|e| CpufreqError::IoFailure {
            op: format!("list {}", self.root.display()),
            cpu: 0,
            source: e,
        })?;

        let mut cpus: Vec<CpuId> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| parse_cpu_dir_name(&entry.file_name().to_string_lossy()))
            .collect();
        cpus.sort_unstable();
        Ok(cpus)
    }
}

fn is_list(attr: Attribute) -> bool {
    matches!(
        attr,
        Attribute::ScalingAvailableGovernors
            | Attribute::ScalingAvailableFrequencies
            | Attribute::AffectedCpus
    )
}

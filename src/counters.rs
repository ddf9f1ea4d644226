//! APERF/MPERF counter acquisition
//!
//! MPERF ticks at the maximum (P0) rate while the core is in C0; APERF
//! ticks at the actual, possibly boosted, rate over the same time. Both
//! are free-running 64-bit MSRs read through the `msr` driver's
//! `/dev/cpu/N/msr` device, where the file offset selects the register.
//!
//! Counters reset to zero underneath us (old kernels did this) cannot be
//! detected and are not supported.

use nix::sys::uio::pread;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CpufreqError, Result};
use crate::policy::CpuId;

/// Default location of the per-CPU msr devices
pub const DEFAULT_MSR_ROOT: &str = "/dev/cpu";

pub const MSR_IA32_MPERF: u32 = 0xE7;
pub const MSR_IA32_APERF: u32 = 0xE8;

/// APERF/MPERF values captured together for one CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterPair {
    pub aperf: u64,
    pub mperf: u64,
}

impl CounterPair {
    pub fn new(aperf: u64, mperf: u64) -> Self {
        Self { aperf, mperf }
    }

    /// Per-counter increase since `earlier`
    ///
    /// Wrapping subtraction is correct as long as each counter wraps at
    /// most once between the two reads.
    pub fn delta_since(&self, earlier: &CounterPair) -> CounterPair {
        CounterPair {
            aperf: self.aperf.wrapping_sub(earlier.aperf),
            mperf: self.mperf.wrapping_sub(earlier.mperf),
        }
    }
}

/// Source of per-CPU counter pairs
pub trait CounterSource {
    fn read_pair(&self, cpu: CpuId) -> Result<CounterPair>;
}

/// Reads counters through the Linux msr driver
#[derive(Debug, Clone)]
pub struct MsrCounterSource {
    root: PathBuf,
}

impl Default for MsrCounterSource {
    fn default() -> Self {
        Self::new(DEFAULT_MSR_ROOT)
    }
}

impl MsrCounterSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn device_path(&self, cpu: CpuId) -> PathBuf {
        self.root.join(cpu.to_string()).join("msr")
    }

    /// Check that the device of `cpu` can be opened for reading
    pub fn probe(&self, cpu: CpuId) -> io::Result<()> {
        File::open(self.device_path(cpu)).map(drop)
    }

    fn read_register(file: &File, index: u32) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        let read = pread(file, &mut buf, index as nix::libc::off_t).map_err(io::Error::from)?;
        if read != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short read of MSR {:#x}: {} bytes", index, read),
            ));
        }
        Ok(u64::from_le_bytes(buf))
    }

    fn read_pair_io(&self, cpu: CpuId) -> io::Result<CounterPair> {
        let file = File::open(self.device_path(cpu))?;
        let aperf = Self::read_register(&file, MSR_IA32_APERF)?;
        let mperf = Self::read_register(&file, MSR_IA32_MPERF)?;
        Ok(CounterPair { aperf, mperf })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CounterSource for MsrCounterSource {
    fn read_pair(&self, cpu: CpuId) -> Result<CounterPair> {
        self.read_pair_io(cpu)
            .map_err(|source| CpufreqError::CounterUnavailable { cpu, source })
    }
}

/// Whether the CPU advertises APERF/MPERF (CPUID.06H:ECX bit 0)
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn cpu_has_effective_freq() -> bool {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::__cpuid;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::__cpuid;

    // SAFETY: cpuid is available on every x86_64 CPU and on all x86 CPUs Linux supports
    #[allow(unused_unsafe)]
    let (max_leaf, ecx) = unsafe {
        let max_leaf = __cpuid(0).eax;
        let ecx = if max_leaf >= 6 { __cpuid(6).ecx } else { 0 };
        (max_leaf, ecx)
    };

    max_leaf >= 6 && ecx & 0x1 != 0
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn cpu_has_effective_freq() -> bool {
    false
}

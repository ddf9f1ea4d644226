// Fake cpufreq/msr control surfaces for integration tests
//
// Builds a throwaway directory tree that mirrors
// /sys/devices/system/cpu/cpuN/cpufreq/* and /dev/cpu/N/msr so the library
// and the binary can run without privileges or real hardware.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Attribute values for one fake CPU
#[derive(Debug, Clone)]
pub struct FakeCpu {
    pub hw_min: u64,
    pub hw_max: u64,
    pub governor: &'static str,
    pub min: u64,
    pub max: u64,
    pub driver: &'static str,
    pub governors: &'static str,
    pub frequencies: &'static str,
    pub affected: &'static str,
}

impl Default for FakeCpu {
    fn default() -> Self {
        Self {
            hw_min: 800_000,
            hw_max: 2_000_000,
            governor: "ondemand",
            min: 800_000,
            max: 2_000_000,
            driver: "acpi-cpufreq",
            governors: "conservative ondemand userspace powersave performance",
            frequencies: "2000000 1600000 1200000 800000",
            affected: "0",
        }
    }
}

pub struct FakeMachine {
    dir: TempDir,
}

impl FakeMachine {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("sys")).expect("Failed to create sysfs root");
        fs::create_dir_all(dir.path().join("msr")).expect("Failed to create msr root");
        Self { dir }
    }

    pub fn sysfs_root(&self) -> PathBuf {
        self.dir.path().join("sys")
    }

    pub fn msr_root(&self) -> PathBuf {
        self.dir.path().join("msr")
    }

    pub fn cpufreq_dir(&self, cpu: u32) -> PathBuf {
        self.sysfs_root().join(format!("cpu{}", cpu)).join("cpufreq")
    }

    /// Write a full cpufreq directory for `cpu` (kernel style, newline-terminated)
    pub fn add_cpu(&self, cpu: u32, fake: &FakeCpu) -> &Self {
        let dir = self.cpufreq_dir(cpu);
        fs::create_dir_all(&dir).expect("Failed to create cpufreq dir");

        let values = [
            ("cpuinfo_min_freq", fake.hw_min.to_string()),
            ("cpuinfo_max_freq", fake.hw_max.to_string()),
            ("cpuinfo_cur_freq", fake.max.to_string()),
            ("scaling_cur_freq", fake.max.to_string()),
            ("scaling_min_freq", fake.min.to_string()),
            ("scaling_max_freq", fake.max.to_string()),
            ("scaling_governor", fake.governor.to_string()),
            ("scaling_driver", fake.driver.to_string()),
            ("scaling_available_governors", format!("{} ", fake.governors)),
            ("scaling_available_frequencies", format!("{} ", fake.frequencies)),
            ("affected_cpus", fake.affected.to_string()),
            ("scaling_setspeed", "<unsupported>".to_string()),
        ];
        for (name, value) in values {
            write_attr(&dir, name, &value);
        }
        self
    }

    /// CPU directory without a cpufreq subtree (present but not scalable)
    pub fn add_bare_cpu(&self, cpu: u32) -> &Self {
        fs::create_dir_all(self.sysfs_root().join(format!("cpu{}", cpu)))
            .expect("Failed to create cpu dir");
        self
    }

    pub fn set_attr(&self, cpu: u32, name: &str, value: &str) {
        write_attr(&self.cpufreq_dir(cpu), name, value);
    }

    pub fn read_attr(&self, cpu: u32, name: &str) -> String {
        fs::read_to_string(self.cpufreq_dir(cpu).join(name)).expect("Failed to read attribute")
    }

    /// Create a readable msr device for `cpu`
    ///
    /// A flat file cannot hold the 64-bit MSRs at their real indices (0xE7
    /// and 0xE8 overlap), so every register reads as zero. Tests that need
    /// moving counters script a `CounterSource` instead.
    pub fn add_counter_device(&self, cpu: u32) {
        let dir = self.msr_root().join(cpu.to_string());
        fs::create_dir_all(&dir).expect("Failed to create msr dir");
        fs::write(dir.join("msr"), [0u8; 0x100]).expect("Failed to write fake msr");
    }

    pub fn remove_counters(&self, cpu: u32) {
        let _ = fs::remove_dir_all(self.msr_root().join(cpu.to_string()));
    }
}

fn write_attr(dir: &Path, name: &str, value: &str) {
    fs::write(dir.join(name), format!("{}\n", value)).expect("Failed to write attribute");
}

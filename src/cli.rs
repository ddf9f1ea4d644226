//! CLI argument parsing for cpufreq-aperf

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::attribute::DEFAULT_SYSFS_ROOT;
use crate::config::MonitorConfig;
use crate::counters::DEFAULT_MSR_ROOT;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cpufreq-aperf")]
#[command(version)]
#[command(
    about = "Average CPU frequency and C0/Cx residency from APERF/MPERF",
    long_about = None,
    after_help = "The msr driver must be loaded for this command to work"
)]
pub struct Cli {
    /// The CPU core to measure (default: all cores)
    #[arg(short = 'c', long = "cpu", value_name = "CPU")]
    pub cpu: Option<u32>,

    /// Refresh rate in seconds
    #[arg(
        short = 'i',
        long = "interval",
        visible_alias = "intervall",
        value_name = "SECONDS",
        default_value = "1"
    )]
    pub interval: u64,

    /// Exit after one interval
    #[arg(short = 'o', long = "once")]
    pub once: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Root of the per-CPU cpufreq attribute tree
    #[arg(long = "sysfs-root", value_name = "DIR", default_value = DEFAULT_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,

    /// Root of the per-CPU msr devices
    #[arg(long = "msr-root", value_name = "DIR", default_value = DEFAULT_MSR_ROOT)]
    pub msr_root: PathBuf,
}

impl Cli {
    pub fn to_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.interval),
            cpu: self.cpu,
            once: self.once,
            sysfs_root: self.sysfs_root.clone(),
            msr_root: self.msr_root.clone(),
            format: self.format,
        }
    }
}

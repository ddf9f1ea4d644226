//! cpufreq-aperf - CPU frequency policy access and APERF/MPERF monitoring
//!
//! This library reads and writes per-CPU cpufreq scaling policy through the
//! sysfs attribute namespace, and derives average effective frequency and
//! C0/Cx residency from the APERF/MPERF hardware counters sampled at a
//! fixed interval.

pub mod attribute;
pub mod cli;
pub mod codec;
pub mod config;
pub mod counters;
pub mod error;
pub mod output;
pub mod policy;
pub mod repository;
pub mod sampler;
pub mod sampling_loop;

pub use error::{CpufreqError, Result};

//! Error types for policy access and counter sampling

use std::io;
use thiserror::Error;

use crate::policy::CpuId;

/// Errors raised by the policy repository and the sampling engine
#[derive(Error, Debug)]
pub enum CpufreqError {
    /// An attribute or CPU is missing, unreadable, or reads as the "unknown" sentinel
    #[error("{what} not available for CPU {cpu}")]
    NotFound { cpu: CpuId, what: String },

    /// Malformed numeric or list content
    #[error("failed to parse {what}: {input:?}")]
    ParseError { what: String, input: String },

    /// Governor name fails charset/length validation
    #[error("invalid governor name: {0:?}")]
    InvalidGovernor(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Hardware limits are zero or unreadable, so no sampling baseline can be built
    #[error("CPU {0} does not report hardware frequency limits")]
    Unsupported(CpuId),

    /// APERF/MPERF read failed (offline core, msr driver missing)
    #[error("APERF/MPERF counters unavailable on CPU {cpu}")]
    CounterUnavailable {
        cpu: CpuId,
        #[source]
        source: io::Error,
    },

    /// Open/read/write failure on the control surface
    #[error("{op} failed on CPU {cpu}")]
    IoFailure {
        op: String,
        cpu: CpuId,
        #[source]
        source: io::Error,
    },
}

impl CpufreqError {
    pub(crate) fn not_found(cpu: CpuId, what: impl Into<String>) -> Self {
        Self::NotFound {
            cpu,
            what: what.into(),
        }
    }

    pub(crate) fn parse(what: impl Into<String>, input: impl Into<String>) -> Self {
        Self::ParseError {
            what: what.into(),
            input: input.into(),
        }
    }

    /// True for the error kinds that mean "the value simply is not there"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for policy and sampling operations
pub type Result<T> = std::result::Result<T, CpufreqError>;

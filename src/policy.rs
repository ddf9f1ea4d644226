//! Typed CPU frequency policy model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec;
use crate::error::CpufreqError;

/// Logical core index as enumerated by the control surface
pub type CpuId = u32;

/// Frequency in kHz
pub type FrequencyKHz = u64;

/// Governor the kernel exposes for direct frequency requests
pub const USERSPACE_GOVERNOR: &str = "userspace";

/// A validated scaling governor name
///
/// 1-19 bytes of ASCII letters, digits, `-` or `_`. Construct through
/// [`GovernorName::new`] or `str::parse`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GovernorName(String);

impl GovernorName {
    /// Maximum name length in bytes (the kernel buffer holds 20 including the terminator)
    pub const MAX_LEN: usize = 19;

    pub fn new(raw: &str) -> Result<Self, CpufreqError> {
        codec::validate_governor(raw)
    }

    pub(crate) fn from_validated(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GovernorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GovernorName {
    type Err = CpufreqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GovernorName {
    type Error = CpufreqError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<GovernorName> for String {
    fn from(name: GovernorName) -> Self {
        name.0
    }
}

impl AsRef<str> for GovernorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Scaling policy of one CPU: governor plus min/max bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuPolicy {
    pub governor: GovernorName,
    pub min: FrequencyKHz,
    pub max: FrequencyKHz,
}

impl CpuPolicy {
    pub fn new(governor: GovernorName, min: FrequencyKHz, max: FrequencyKHz) -> Self {
        Self { governor, min, max }
    }

    /// True when the bounds are ordered (`min <= max`)
    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// Immutable capability range of a CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareLimits {
    pub min: FrequencyKHz,
    pub max: FrequencyKHz,
}

impl HardwareLimits {
    pub fn contains(&self, freq: FrequencyKHz) -> bool {
        (self.min..=self.max).contains(&freq)
    }
}

//! Text codec for cpufreq attribute values
//!
//! The control surface speaks ASCII: single decimal integers, single
//! strings, or token lists separated by spaces, NULs or newlines. This
//! module turns those blobs into typed values and back.

use crate::error::{CpufreqError, Result};
use crate::policy::{CpuId, FrequencyKHz, GovernorName};

/// Longest list entry accepted before the whole list is rejected
pub const MAX_TOKEN_LEN: usize = 255;

/// Minimum token length for governor and frequency lists
pub const MIN_NAME_TOKEN_LEN: usize = 2;

/// Minimum token length for CPU id lists
pub const MIN_CPU_TOKEN_LEN: usize = 1;

const DELIMITERS: [char; 3] = [' ', '\0', '\n'];

/// Parse the leading unsigned decimal integer of `text`
///
/// Leading whitespace is skipped and anything after the digits is
/// ignored. Fails when no digit is present or the value overflows `u64`.
pub fn parse_uint(text: &str) -> Result<FrequencyKHz> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = &trimmed[..end];

    if digits.is_empty() {
        return Err(CpufreqError::parse("unsigned integer", text));
    }

    digits
        .parse::<u64>()
        .map_err(|_| CpufreqError::parse("unsigned integer (overflow)", text))
}

/// Split an attribute value into tokens
///
/// Runs shorter than `min_token_len` are dropped. Document order is kept.
pub fn parse_token_list(text: &str, min_token_len: usize) -> Vec<String> {
    text.split(DELIMITERS)
        .filter(|token| token.len() >= min_token_len.max(1))
        .map(str::to_string)
        .collect()
}

/// Token list with the fixed-buffer length guard applied to every entry
fn bounded_tokens(text: &str, min_token_len: usize, what: &str) -> Result<Vec<String>> {
    let tokens = parse_token_list(text, min_token_len);
    if let Some(long) = tokens.iter().find(|t| t.len() > MAX_TOKEN_LEN) {
        return Err(CpufreqError::parse(
            format!("{} (entry longer than {} bytes)", what, MAX_TOKEN_LEN),
            long.as_str(),
        ));
    }
    Ok(tokens)
}

/// Parse `scaling_available_governors`
pub fn parse_governor_list(text: &str) -> Result<Vec<String>> {
    bounded_tokens(text, MIN_NAME_TOKEN_LEN, "governor list")
}

/// Parse `scaling_available_frequencies`; one malformed entry fails the list
pub fn parse_frequency_list(text: &str) -> Result<Vec<FrequencyKHz>> {
    bounded_tokens(text, MIN_NAME_TOKEN_LEN, "frequency list")?
        .iter()
        .map(|token| parse_uint(token))
        .collect()
}

/// Parse `affected_cpus`; one malformed entry fails the list
pub fn parse_cpu_list(text: &str) -> Result<Vec<CpuId>> {
    bounded_tokens(text, MIN_CPU_TOKEN_LEN, "cpu list")?
        .iter()
        .map(|token| {
            let value = parse_uint(token)?;
            CpuId::try_from(value).map_err(|_| CpufreqError::parse("cpu id (overflow)", token.as_str()))
        })
        .collect()
}

/// Validate a governor name before it is written to the control surface
///
/// The first NUL terminates the name. The remaining prefix must be 1-19
/// bytes of ASCII letters, digits, `-` or `_`.
pub fn validate_governor(raw: &str) -> Result<GovernorName> {
    let name = raw.split('\0').next().unwrap_or_default();

    if name.is_empty() || name.len() > GovernorName::MAX_LEN {
        return Err(CpufreqError::InvalidGovernor(raw.to_string()));
    }

    let valid = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid {
        return Err(CpufreqError::InvalidGovernor(raw.to_string()));
    }

    Ok(GovernorName::from_validated(name.to_string()))
}

/// Canonical decimal form of a value written to the control surface
pub fn encode_uint(value: u64) -> String {
    value.to_string()
}

/// Strip the single trailing newline the kernel appends to string attributes
pub fn decode_string(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uint_plain_and_newline() {
        assert_eq!(parse_uint("2400000").unwrap(), 2_400_000);
        assert_eq!(parse_uint("2400000\n").unwrap(), 2_400_000);
        assert_eq!(parse_uint("  800000 kHz").unwrap(), 800_000);
    }

    #[test]
    fn test_parse_uint_rejects_garbage() {
        assert!(parse_uint("").is_err());
        assert!(parse_uint("\n").is_err());
        assert!(parse_uint("abc").is_err());
        assert!(parse_uint("-5").is_err());
    }

    #[test]
    fn test_parse_uint_overflow() {
        assert!(parse_uint("18446744073709551615").is_ok());
        let err = parse_uint("18446744073709551616").unwrap_err();
        assert!(matches!(err, CpufreqError::ParseError { .. }));
    }

    #[test]
    fn test_token_list_frequencies() {
        assert_eq!(
            parse_token_list("1600000 1400000 1200000\n", 2),
            vec!["1600000", "1400000", "1200000"]
        );
    }

    #[test]
    fn test_token_list_drops_short_tokens() {
        assert_eq!(parse_token_list("0 1 22 333", 2), vec!["22", "333"]);
    }

    #[test]
    fn test_token_list_mixed_delimiters() {
        assert_eq!(
            parse_token_list("performance\0powersave\n\nondemand  ", 2),
            vec!["performance", "powersave", "ondemand"]
        );
    }

    #[test]
    fn test_token_list_zero_min_len_never_yields_empty() {
        assert_eq!(parse_token_list("a  b\n", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_cpu_list_keeps_single_digits() {
        assert_eq!(parse_cpu_list("0 1 2 3\n").unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_frequency_list_fails_whole_on_bad_entry() {
        assert!(parse_frequency_list("1600000 fast 1200000").is_err());
    }

    #[test]
    fn test_list_rejects_oversized_entry() {
        let long = "9".repeat(MAX_TOKEN_LEN + 1);
        let input = format!("1600000 {}\n", long);
        assert!(parse_frequency_list(&input).is_err());
        assert!(parse_governor_list(&format!("performance {}", "a".repeat(300))).is_err());
    }

    #[test]
    fn test_cpu_list_overflow() {
        assert!(parse_cpu_list("0 4294967296").is_err());
    }

    #[test]
    fn test_validate_governor_accepts_charset() {
        for name in ["performance", "power-save", "my_gov2", "a", "ABCDEFGHIJKLMNOPQRS"] {
            assert_eq!(validate_governor(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_validate_governor_rejects() {
        assert!(validate_governor("").is_err());
        assert!(validate_governor("ABCDEFGHIJKLMNOPQRST").is_err()); // 20 bytes
        assert!(validate_governor("on demand").is_err());
        assert!(validate_governor("perf\n").is_err());
        assert!(validate_governor("../../etc").is_err());
        assert!(validate_governor("\0performance").is_err());
    }

    #[test]
    fn test_validate_governor_truncates_at_nul() {
        let gov = validate_governor("userspace\0 garbage!").unwrap();
        assert_eq!(gov.as_str(), "userspace");
    }

    #[test]
    fn test_encode_uint() {
        assert_eq!(encode_uint(0), "0");
        assert_eq!(encode_uint(1_800_000), "1800000");
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string("acpi-cpufreq\n"), "acpi-cpufreq");
        assert_eq!(decode_string("intel_pstate"), "intel_pstate");
        assert_eq!(decode_string("x\n\n"), "x\n");
    }
}

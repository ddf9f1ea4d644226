//! Comprehensive property-based tests
//!
//! Covers the attribute codec, governor validation and the sampling math
//! with proptest. Kept small enough to run as a pre-commit quality gate.
//!
//! Core features tested:
//! 1. Governor name validation
//! 2. Token list parsing
//! 3. Average frequency derivation
//! 4. C0/Cx residency split
//! 5. Policy round trips through a fake sysfs tree

mod utils;

use cpufreq_aperf::codec;
use cpufreq_aperf::counters::CounterPair;
use cpufreq_aperf::sampler::{average_frequency, derive_sample, residency};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_valid_governor_names_accepted(name in "[A-Za-z0-9_-]{1,19}") {
        let governor = codec::validate_governor(&name).unwrap();
        prop_assert_eq!(governor.as_str(), name.as_str());
    }

    #[test]
    fn prop_long_governor_names_rejected(name in "[a-z]{20,40}") {
        prop_assert!(codec::validate_governor(&name).is_err());
    }

    #[test]
    fn prop_governor_charset_enforced(
        prefix in "[a-z]{0,5}",
        bad in "[ ./:;!@#$%^&*()=+]",
        suffix in "[a-z]{0,5}",
    ) {
        let name = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(codec::validate_governor(&name).is_err());
    }

    #[test]
    fn prop_nul_terminates_governor(name in "[a-z]{1,10}", tail in "[ -~]{0,20}") {
        let raw = format!("{}\0{}", name, tail);
        let governor = codec::validate_governor(&raw).unwrap();
        prop_assert_eq!(governor.as_str(), name.as_str());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_token_list_keeps_order(
        tokens in prop::collection::vec("[a-z0-9]{2,12}", 0..10),
        trailing in prop::sample::select(vec!["", " ", "\n", " \n"]),
    ) {
        let text = format!("{}{}", tokens.join(" "), trailing);
        prop_assert_eq!(codec::parse_governor_list(&text).unwrap(), tokens);
    }

    #[test]
    fn prop_token_list_never_yields_short_or_delimited_tokens(text in "[a-z \n\0]{0,64}") {
        for token in codec::parse_token_list(&text, 2) {
            prop_assert!(token.len() >= 2);
            prop_assert!(!token.contains([' ', '\n', '\0']));
        }
    }

    #[test]
    fn prop_frequency_list_matches_numbers(values in prop::collection::vec(10u64..10_000_000, 1..8)) {
        let text = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(codec::parse_frequency_list(&text).unwrap(), values);
    }

    #[test]
    fn prop_parse_uint_reads_encoded_value(value in any::<u64>()) {
        let text = format!("{}\n", codec::encode_uint(value));
        prop_assert_eq!(codec::parse_uint(&text).unwrap(), value);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_equal_deltas_give_max_frequency(
        max_freq in 1u64..10_000_000,
        delta in 1u64..(u64::MAX / 100),
    ) {
        prop_assert_eq!(average_frequency(max_freq, delta, delta), Some(max_freq));
    }

    #[test]
    fn prop_average_frequency_unshifted(
        max_freq in 1u64..10_000_000,
        aperf in 0u64..1_000_000_000_000,
        mperf in 1u64..1_000_000_000_000,
    ) {
        let percent = u128::from(aperf * 100 / mperf);
        let expected = (u128::from(max_freq) * percent / 100).min(u128::from(u64::MAX)) as u64;
        prop_assert_eq!(average_frequency(max_freq, aperf, mperf), Some(expected));
    }

    #[test]
    fn prop_average_frequency_never_panics(
        max_freq in any::<u64>(),
        aperf in any::<u64>(),
        mperf in any::<u64>(),
    ) {
        let _ = average_frequency(max_freq, aperf, mperf);
    }

    #[test]
    fn prop_residency_percent_bounded(
        elapsed_ms in 0u64..100_000,
        mperf in any::<u64>(),
        max_freq in 0u64..10_000_000,
    ) {
        let split = residency(Duration::from_millis(elapsed_ms), mperf, max_freq);
        prop_assert!(split.active_percent <= 100);
        prop_assert!(split.sleep_time <= Duration::from_millis(elapsed_ms));
    }

    #[test]
    fn prop_zero_elapsed_is_all_zero(mperf in any::<u64>(), max_freq in any::<u64>()) {
        let split = residency(Duration::ZERO, mperf, max_freq);
        prop_assert_eq!(split.active_time, Duration::ZERO);
        prop_assert_eq!(split.sleep_time, Duration::ZERO);
        prop_assert_eq!(split.active_percent, 0);
    }

    #[test]
    fn prop_stall_exactly_when_mperf_static(
        aperf in 0u64..1_000_000,
        mperf in 0u64..1_000_000,
    ) {
        let sample = derive_sample(2_000_000, CounterPair::new(aperf, mperf), Duration::from_secs(1));
        prop_assert_eq!(sample.counter_stall, mperf == 0);
        if sample.counter_stall {
            prop_assert_eq!(sample.average_freq, 0);
        }
    }

    #[test]
    fn prop_delta_survives_wraparound(start in any::<u64>(), step in 0u64..1_000_000_000) {
        let before = CounterPair::new(start, start);
        let after = CounterPair::new(start.wrapping_add(step), start.wrapping_add(step));
        prop_assert_eq!(after.delta_since(&before), CounterPair::new(step, step));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_policy_roundtrip(
        min in 100_000u64..2_000_000,
        span in 0u64..2_000_000,
        governor in "[a-z]{2,19}",
    ) {
        use cpufreq_aperf::attribute::SysfsStore;
        use cpufreq_aperf::policy::{CpuPolicy, GovernorName};
        use cpufreq_aperf::repository::PolicyRepository;

        let machine = utils::FakeMachine::new();
        machine.add_cpu(0, &utils::FakeCpu::default());
        let repo = PolicyRepository::new(SysfsStore::new(machine.sysfs_root()));

        let policy = CpuPolicy::new(GovernorName::new(&governor).unwrap(), min, min + span);
        repo.set_policy(0, &policy).unwrap();
        prop_assert_eq!(repo.get_policy(0).unwrap(), policy);
    }
}

#![no_main]

use cpufreq_aperf::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Attribute files are read as text; anything else is rejected earlier
    if let Ok(input) = std::str::from_utf8(data) {
        let _ = codec::parse_uint(input);
        let _ = codec::parse_governor_list(input);
        let _ = codec::parse_frequency_list(input);
        let _ = codec::parse_cpu_list(input);

        if let Ok(governor) = codec::validate_governor(input) {
            assert!(governor.as_str().len() <= 19);
            assert!(!governor.as_str().contains('\0'));
        }
    }
});

//! Fuzz target: `RuleRecord::decode`
//!
//! Feeds arbitrary 32-byte records through the decoder and checks that
//! every decoded record re-encodes to a record that decodes to itself.
//!
//! cargo fuzz run fuzz_rule_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use mastercell::rules::RuleRecord;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = <[u8; 32]>::try_from(data) else {
        return;
    };

    match RuleRecord::decode(&raw) {
        Some(record) => {
            assert!(record.priority <= 7, "priority wider than three bits");
            assert!(record.pattern_on <= 0x0F && record.pattern_off <= 0x0F);
            let again = RuleRecord::decode(&record.encode());
            assert_eq!(again, Some(record), "encode must be the inverse of decode");
        }
        None => assert!(raw[..4].iter().all(|&b| b == 0xFF), "only blank headers decode to None"),
    }
});

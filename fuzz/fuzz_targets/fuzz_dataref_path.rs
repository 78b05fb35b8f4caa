//! Fuzz target: dataref path parsing
//!
//! Arbitrary UTF-8 must never panic the parser, and the parsed pieces
//! must stay consistent with each other.
//!
//! cargo fuzz run fuzz_dataref_path

#![no_main]

use libfuzzer_sys::fuzz_target;
use simdeck::value::DatarefPath;

fuzz_target!(|spec: &str| {
    let parsed = DatarefPath::parse(spec);

    // An indexed path always reports its base without the brackets.
    if parsed.index.is_some() {
        assert!(parsed.base.len() < parsed.path.len());
        assert!(!parsed.base.contains('['));
    }
    // The wildcard form only exists for indexed paths.
    assert_eq!(parsed.wildcard().is_some(), parsed.index.is_some());
});

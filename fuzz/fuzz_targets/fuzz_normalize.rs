//! Fuzz target for user-agent normalization.
//!
//! Every pipeline must be total and idempotent; user agents are attacker
//! controlled.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ua_normalize::{Pipeline, Stage};

fuzz_target!(|ua: &str| {
    let generic = Pipeline::generic();
    let once = generic.normalize(ua);
    assert_eq!(generic.normalize(&once), once);

    for stage in [Stage::Android, Stage::Chrome, Stage::Opera, Stage::Msie, Stage::Safari] {
        let _ = generic.with_stage(stage).normalize(ua);
    }
});

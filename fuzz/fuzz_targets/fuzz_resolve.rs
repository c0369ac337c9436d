//! Fuzz target for handler-chain resolution.
//!
//! Resolution never fails: any input must land on a device the repository
//! contains.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use ua_config::MatchMode;
use ua_core::handlers::Chain;
use ua_core::{BuiltRepository, RepositoryBuilder};

static BUILT: Lazy<Option<BuiltRepository>> = Lazy::new(|| {
    let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/../test/fixtures/devices");
    RepositoryBuilder::new(format!("{fixtures}/wurfl.xml"))
        .patch(format!("{fixtures}/patch_web_browsers.xml"))
        .build()
        .ok()
});

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    performance: bool,
    user_agent: &'a str,
}

fuzz_target!(|input: Input<'_>| {
    let Some(built) = BUILT.as_ref() else {
        return;
    };
    let mode = if input.performance {
        MatchMode::Performance
    } else {
        MatchMode::Accuracy
    };
    let outcome = Chain::standard().resolve(&built.repository, mode, input.user_agent);
    assert!(built.repository.contains(&outcome.device_id));
});

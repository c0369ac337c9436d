//! Fuzz target for engine configuration parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ua_config::{validate_config, EngineConfig};

fuzz_target!(|content: &str| {
    if let Ok(config) = EngineConfig::from_toml_str(content) {
        let _ = validate_config(&config);
    }
});

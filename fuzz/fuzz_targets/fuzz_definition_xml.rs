//! Fuzz target for definition document parsing.
//!
//! Definition files are downloaded from third parties; parsing must return
//! an error on bad input, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;
use ua_core::builder::xml::parse_document;

fuzz_target!(|data: &[u8]| {
    let _ = parse_document(data, Path::new("fuzz.xml"), &|_, _| true);
});

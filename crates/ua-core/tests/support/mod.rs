//! Shared fixture helpers for ua-core integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use ua_config::EngineConfig;
use ua_core::{BuiltRepository, RepositoryBuilder};
use ua_store::Provider;

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("test")
        .join("fixtures")
}

pub fn device_fixture(name: &str) -> PathBuf {
    fixtures_dir().join("devices").join(name)
}

pub fn base_definition() -> PathBuf {
    device_fixture("wurfl.xml")
}

pub fn web_browsers_patch() -> PathBuf {
    device_fixture("patch_web_browsers.xml")
}

/// Base definition plus the web browser patch.
pub fn build_fixture() -> BuiltRepository {
    RepositoryBuilder::new(base_definition())
        .patch(web_browsers_patch())
        .build()
        .expect("fixture definitions should build")
}

/// In-memory configuration over the fixture definitions.
pub fn memory_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.database.main = Some(base_definition());
    config.database.patches = vec![web_browsers_patch()];
    config.persistence.provider = Provider::Memory;
    config.cache.provider = Provider::Memory;
    config
}

/// File-backed configuration rooted at `dir`.
pub fn file_config(dir: &Path) -> EngineConfig {
    let mut config = memory_config();
    config.persistence.provider = Provider::File;
    config.persistence.dir = Some(dir.join("repository"));
    config.cache.provider = Provider::File;
    config.cache.dir = Some(dir.join("lookups"));
    config
}

pub const NOKIA_3220_UP_BROWSER: &str = "Nokia3220 UP.Browser/7.0.2.3.119 (GUI) MMP/2.0 Push/PO";
pub const BECOME_BOT: &str =
    "Mozilla/5.0 (compatible; BecomeBot/3.0; +http://www.become.com/site_owners.html)";
pub const HTC_HERO: &str = "Mozilla/5.0 (Linux; U; Android 2.1-update1; de-de; HTC Hero Build/ERE27) AppleWebKit/530.17 (KHTML, like Gecko) Version/4.0 Mobile Safari/530.17";
pub const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/535.7 (KHTML, like Gecko) Chrome/16.0.912.63 Safari/535.7";

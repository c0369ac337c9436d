//! Manager facade end-to-end tests: startup, persistence and lookups.

mod support;

use support::*;
use tempfile::TempDir;
use ua_common::Error;
use ua_core::manager::{Manager, RepositoryOrigin};
use ua_store::Provider;

#[test]
fn literal_scenarios_through_the_facade() {
    let manager = Manager::new(&memory_config()).unwrap();
    assert_eq!(
        manager.get_device_for_user_agent(NOKIA_3220_UP_BROWSER).id,
        "nokia_3220_ver1"
    );
    assert_eq!(
        manager.get_device_for_user_agent(HTC_HERO).id,
        "htc_hero_ver1_subandroid21saf4"
    );
    assert_eq!(
        manager.get_capability("ericsson_t20_ver1", "resolution_width").unwrap(),
        "101"
    );
}

#[test]
fn empty_or_absent_user_agent_is_root() {
    let manager = Manager::new(&memory_config()).unwrap();
    assert_eq!(manager.get_device_for_user_agent("").id, "generic");
    assert_eq!(
        manager
            .get_device_for_headers([("accept", "text/html")])
            .id,
        "generic"
    );
}

#[test]
fn forwarded_device_header_takes_precedence() {
    let manager = Manager::new(&memory_config()).unwrap();
    let device = manager.get_device_for_headers([
        ("User-Agent", "Opera/9.80 (J2ME/MIDP; Opera Mini/5.0.18741/1046; U; en) Presto/2.4.15"),
        ("X-Device-User-Agent", NOKIA_3220_UP_BROWSER),
    ]);
    assert_eq!(device.id, "nokia_3220_ver1");
}

#[test]
fn catalog_queries() {
    let manager = Manager::new(&memory_config()).unwrap();

    let ids = manager.get_all_devices_id();
    assert!(ids.contains(&"generic"));
    assert!(ids.contains(&"google_chrome"));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(
        manager.get_list_of_groups(),
        vec!["product_info", "display", "markup"]
    );
    assert_eq!(
        manager.get_capabilities_name_for_group("display").unwrap(),
        ["resolution_width", "resolution_height", "physical_screen_width"]
    );
    assert!(matches!(
        manager.get_capabilities_name_for_group("sound"),
        Err(Error::UnknownGroup { .. })
    ));

    let chain: Vec<_> = manager
        .get_fall_back_devices("ericsson_t20_ver1")
        .unwrap()
        .into_iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(
        chain,
        ["ericsson_t20_ver1", "ericsson_generic", "generic_xhtml", "generic_mobile", "generic"]
    );

    let info = manager.get_database_info();
    assert_eq!(info.version, "fixture 2.3.1");
    assert_eq!(info.last_updated, "2012-03-01");
}

#[test]
fn lookup_errors_are_distinct() {
    let manager = Manager::new(&memory_config()).unwrap();
    assert!(matches!(
        manager.get_device("nokia_9999"),
        Err(Error::DeviceNotFound { .. })
    ));
    assert!(matches!(
        manager.get_capability("nokia_3220_ver1", "is_teleporter"),
        Err(Error::UndefinedCapability { .. })
    ));
}

#[test]
fn persisted_repository_is_reused_until_sources_change() {
    let dir = TempDir::new().unwrap();
    let config = file_config(dir.path());

    let first = Manager::new(&config).unwrap();
    assert_eq!(first.origin(), RepositoryOrigin::Built);
    let fingerprint = first.fingerprint().to_string();
    drop(first);

    let second = Manager::new(&config).unwrap();
    assert_eq!(second.origin(), RepositoryOrigin::Persisted);
    assert_eq!(second.fingerprint(), fingerprint);
    assert_eq!(
        second.get_device_for_user_agent(NOKIA_3220_UP_BROWSER).id,
        "nokia_3220_ver1"
    );
    drop(second);

    let mut patched = config.clone();
    patched
        .database
        .patches
        .push(device_fixture("patch_precedence_a.xml"));
    let third = Manager::new(&patched).unwrap();
    assert_eq!(third.origin(), RepositoryOrigin::Built);
    assert_ne!(third.fingerprint(), fingerprint);
    assert_eq!(
        third.get_capability("nokia_3220_ver1", "resolution_width").unwrap(),
        "150"
    );
}

#[test]
fn same_length_patch_edit_forces_rebuild() {
    let dir = TempDir::new().unwrap();
    let patch = dir.path().join("width.xml");
    let write_patch = |width: &str| {
        std::fs::write(
            &patch,
            format!(
                r#"<wurfl_patch><devices><device id="nokia_3220_ver1"><group id="display"><capability name="resolution_width" value="{width}"/></group></device></devices></wurfl_patch>"#
            ),
        )
        .unwrap();
    };

    let mut config = file_config(dir.path());
    config.database.patches.push(patch.clone());

    write_patch("176");
    let first = Manager::new(&config).unwrap();
    assert_eq!(first.origin(), RepositoryOrigin::Built);
    assert_eq!(
        first.get_capability("nokia_3220_ver1", "resolution_width").unwrap(),
        "176"
    );
    drop(first);

    write_patch("240");
    let second = Manager::new(&config).unwrap();
    assert_eq!(second.origin(), RepositoryOrigin::Built);
    assert_eq!(
        second.get_capability("nokia_3220_ver1", "resolution_width").unwrap(),
        "240"
    );
}

#[test]
fn persisted_repository_serves_without_sources() {
    let dir = TempDir::new().unwrap();
    let config = file_config(dir.path());
    Manager::new(&config).unwrap();

    let mut no_sources = config.clone();
    no_sources.database.main = None;
    no_sources.database.patches.clear();
    let manager = Manager::new(&no_sources).unwrap();
    assert_eq!(manager.origin(), RepositoryOrigin::Persisted);
    assert_eq!(manager.get_device_for_user_agent(HTC_HERO).id, "htc_hero_ver1_subandroid21saf4");
}

#[test]
fn corrupted_persistence_is_rebuilt_from_sources() {
    let dir = TempDir::new().unwrap();
    let config = file_config(dir.path());
    {
        let store = ua_store::open(Provider::File, Some(&dir.path().join("repository"))).unwrap();
        store
            .put(ua_core::builder::REPOSITORY_KEY, b"not a repository", ua_store::Ttl::Never)
            .unwrap();
    }
    let manager = Manager::new(&config).unwrap();
    assert_eq!(manager.origin(), RepositoryOrigin::Built);
}

#[test]
fn unreachable_persistence_degrades_to_a_build() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"a file, not a directory").unwrap();

    let mut config = memory_config();
    config.persistence.provider = Provider::File;
    config.persistence.dir = Some(blocker.join("repository"));
    let manager = Manager::new(&config).unwrap();
    assert_eq!(manager.origin(), RepositoryOrigin::Built);

    config.database.main = None;
    config.database.patches.clear();
    let err = match Manager::new(&config) {
        Err(e) => e,
        Ok(_) => panic!("no sources and no store should fail"),
    };
    assert!(matches!(err, Error::StoreUnavailable(_)));
}

#[test]
fn lookups_are_memoized_per_fingerprint() {
    let dir = TempDir::new().unwrap();
    let config = file_config(dir.path());
    let manager = Manager::new(&config).unwrap();
    let request = manager.request_factory().from_user_agent(NOKIA_3220_UP_BROWSER);

    let first = manager.lookup(&request);
    assert!(!first.cached);
    assert!(first.matched.is_some());
    let second = manager.lookup(&request);
    assert!(second.cached);
    assert_eq!(second.device.id, first.device.id);

    manager.clear_cache().unwrap();
    assert!(!manager.lookup(&request).cached);
}

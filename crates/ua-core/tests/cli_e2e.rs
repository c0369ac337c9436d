//! CLI end-to-end tests for the ua-core binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use support::*;
use tempfile::TempDir;

fn ua_core() -> Command {
    let mut cmd = Command::cargo_bin("ua-core").expect("ua-core binary should exist");
    cmd.env_remove("UACAP_CONFIG")
        .env_remove("UACAP_CONFIG_DIR")
        .env("UACAP_LOG", "error");
    cmd
}

/// Writes a config using file stores under `dir`.
fn write_config(dir: &Path, patches: &[PathBuf]) -> PathBuf {
    let patches: Vec<String> = patches
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect();
    let content = format!(
        "[database]\nmain = '{}'\npatches = [{}]\n\n[persistence]\nprovider = \"file\"\ndir = '{}'\n\n[cache]\nprovider = \"file\"\ndir = '{}'\n",
        base_definition().display(),
        patches.join(", "),
        dir.join("repository").display(),
        dir.join("lookups").display(),
    );
    let path = dir.join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn configured() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &[web_browsers_patch()]);
    (dir, config)
}

// ============================================================================
// build
// ============================================================================

mod build {
    use super::*;

    #[test]
    fn builds_and_reports_json() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"built\""))
            .stdout(predicate::str::contains("fixture 2.3.1"));
    }

    #[test]
    fn explicit_sources_override_config() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "summary", "build", "--main"])
            .arg(base_definition())
            .arg("--patch")
            .arg(device_fixture("patch_precedence_a.xml"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("built "));
    }

    #[test]
    fn cycle_exits_with_integrity_code() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["build", "--patch"])
            .arg(device_fixture("patch_cycle.xml"))
            .assert()
            .code(12)
            .stderr(predicate::str::contains("cycle"));
    }

    #[test]
    fn unknown_fallback_exits_with_integrity_code() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["build", "--patch"])
            .arg(device_fixture("patch_unknown_fallback.xml"))
            .assert()
            .code(12)
            .stderr(predicate::str::contains("no_such_device"));
    }

    #[test]
    fn malformed_definition_exits_with_config_code() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["build", "--main"])
            .arg(device_fixture("malformed.xml"))
            .assert()
            .code(11);
    }
}

// ============================================================================
// lookups
// ============================================================================

mod lookup {
    use super::*;

    #[test]
    fn resolves_literal_user_agent() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["lookup", NOKIA_3220_UP_BROWSER, "-c", "resolution_width"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"id\": \"nokia_3220_ver1\""))
            .stdout(predicate::str::contains("\"resolution_width\": 128"));
    }

    #[test]
    fn header_precedence() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "summary", "lookup", "Opera/9.80 (J2ME/MIDP) Presto/2.4.15"])
            .arg("--header")
            .arg(format!("X-Device-User-Agent={HTC_HERO}"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("htc_hero_ver1_subandroid21saf4"));
    }

    #[test]
    fn empty_user_agent_is_root() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "summary", "lookup", ""])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("generic "));
    }

    #[test]
    fn performance_mode_override() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--mode", "performance", "--format", "summary", "lookup", CHROME_DESKTOP])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("generic_web_browser"));
    }

    #[test]
    fn malformed_header_is_an_argument_error() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["lookup", "x", "--header", "no-equals-sign"])
            .assert()
            .code(10);
    }

    #[test]
    fn undefined_capability_is_not_found() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["lookup", NOKIA_3220_UP_BROWSER, "-c", "warp_drive"])
            .assert()
            .code(13)
            .stderr(predicate::str::contains("warp_drive"));
    }
}

// ============================================================================
// inspection
// ============================================================================

mod inspect {
    use super::*;

    #[test]
    fn device_with_inherited_capability() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["device", "ericsson_t20_ver1", "-c", "resolution_width"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"resolution_width\": 101"));
    }

    #[test]
    fn unknown_device_exits_not_found() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["device", "nokia_9999"])
            .assert()
            .code(13)
            .stderr(predicate::str::contains("nokia_9999"));
    }

    #[test]
    fn fallbacks_end_at_root() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "summary", "fallbacks", "ericsson_t20_ver1"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "ericsson_t20_ver1 -> ericsson_generic -> generic_xhtml -> generic_mobile -> generic",
            ));
    }

    #[test]
    fn groups_and_group_members() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "md", "groups"])
            .assert()
            .success()
            .stdout(predicate::str::contains("product_info"));
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["groups", "display"])
            .assert()
            .success()
            .stdout(predicate::str::contains("resolution_height"));
    }

    #[test]
    fn info_reports_version() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .arg("info")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"version\": \"fixture 2.3.1\""))
            .stdout(predicate::str::contains("\"root\": \"generic\""));
    }
}

// ============================================================================
// verify, cache, version
// ============================================================================

mod maintenance {
    use super::*;

    #[test]
    fn verify_fixture_cases_pass() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .arg("verify")
            .arg(fixtures_dir().join("cases").join("fixture_devices.tsv"))
            .assert()
            .success()
            .stdout(predicate::str::contains("\"mismatches\": []"));
    }

    #[test]
    fn verify_reports_mismatches() {
        let (dir, config) = configured();
        let cases = dir.path().join("wrong.tsv");
        std::fs::write(&cases, format!("nokia_6300_ver1\t{NOKIA_3220_UP_BROWSER}\n")).unwrap();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["--format", "summary", "verify"])
            .arg(&cases)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("0/1 cases matched"));
    }

    #[test]
    fn cache_clear() {
        let (_dir, config) = configured();
        ua_core()
            .arg("--config")
            .arg(&config)
            .args(["cache", "clear", "--persistence"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared"));
    }

    #[test]
    fn version_json() {
        ua_core()
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ua_core_version"));
    }

    #[test]
    fn unknown_command_fails() {
        ua_core()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        ua_core()
            .arg("--config")
            .arg(dir.path().join("absent.toml"))
            .arg("info")
            .assert()
            .code(11);
    }
}

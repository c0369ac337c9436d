//! Android version and model extraction.
//!
//! Shared by the Android and Kindle normalizers, which prefix the user agent
//! with `"<version> <model>---"`, and by the Android matcher's recovery step,
//! which maps versions onto well-known generic device ids.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Version assumed when a user agent carries no recognizable Android version.
pub const DEFAULT_ANDROID_VERSION: &str = "2.0";

/// Versions that map onto generic Android device ids.
pub const VALID_ANDROID_VERSIONS: &[&str] = &[
    "1.0", "1.5", "1.6", "2.0", "2.1", "2.2", "2.3", "2.4", "3.0", "3.1", "3.2", "3.3", "4.0",
    "4.1",
];

/// Opera Mobile version assumed when none can be read.
pub const DEFAULT_OPERA_VERSION: &str = "10";

const VALID_OPERA_VERSIONS: &[&str] = &["10", "11"];

const RELEASE_NAMES: &[(&str, &str)] = &[
    ("Cupcake", "1.5"),
    ("Donut", "1.6"),
    ("Eclair", "2.1"),
    ("Froyo", "2.2"),
    ("Gingerbread", "2.3"),
    ("Honeycomb", "3.0"),
];

static RE_RELEASE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Cupcake|Donut|Eclair|Froyo|Gingerbread|Honeycomb").unwrap());

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Android (\d\.\d)").unwrap());

static RE_OPERA_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Version/(\d\d)").unwrap());

static RE_MODEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Android [\d\.]+; ([^;]+?) Build/").unwrap());

// Model cleanup, applied in order.
static RE_HTC_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"HTC[ _\-/]").unwrap());
static RE_HTC_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(/| V?[\d\.]).*$").unwrap());
static RE_TRAILING_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/.*$").unwrap());
static RE_SAMSUNG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(SAMSUNG[^/]+)/.*$").unwrap());
static RE_ORANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ORANGE/.*$").unwrap());
static RE_LG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(LG-[^/]+)/[vV].*$").unwrap());
static RE_SERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d{10}\]").unwrap());

/// Reads the Android version, replacing release code names by their number.
///
/// Returns `None` unless the version is one of [`VALID_ANDROID_VERSIONS`].
pub fn android_version(ua: &str) -> Option<&'static str> {
    let ua = RE_RELEASE_NAME.replace_all(ua, |caps: &Captures<'_>| {
        RELEASE_NAMES
            .iter()
            .find(|(name, _)| *name == &caps[0])
            .map(|(_, version)| *version)
            .unwrap_or_default()
            .to_string()
    });
    let caps = RE_VERSION.captures(&ua)?;
    let version = caps.get(1)?.as_str();
    VALID_ANDROID_VERSIONS.iter().copied().find(|v| *v == version)
}

/// Like [`android_version`], falling back to [`DEFAULT_ANDROID_VERSION`].
pub fn android_version_or_default(ua: &str) -> &'static str {
    android_version(ua).unwrap_or(DEFAULT_ANDROID_VERSION)
}

/// Reads the two-digit Opera version of Opera Mobile/Tablet on Android.
pub fn opera_on_android_version(ua: &str) -> &'static str {
    RE_OPERA_VERSION
        .captures(ua)
        .and_then(|caps| {
            let version = caps.get(1)?.as_str();
            VALID_OPERA_VERSIONS.iter().copied().find(|v| *v == version)
        })
        .unwrap_or(DEFAULT_OPERA_VERSION)
}

/// Extracts the device model from the `Android x.y; <model> Build/` segment.
///
/// The segment must directly follow the version, so locale-tagged user
/// agents yield nothing until the locale has been removed.
pub fn android_model(ua: &str) -> Option<String> {
    let caps = RE_MODEL.captures(ua)?;
    let mut model = caps
        .get(1)?
        .as_str()
        .trim_end_matches([' ', ';'])
        .to_string();

    if model.starts_with("Build/") {
        return None;
    }

    if model.contains("HTC") {
        model = RE_HTC_SEPARATOR.replace_all(&model, "HTC~").into_owned();
        model = RE_HTC_VERSION.replace(&model, "").into_owned();
        model = RE_TRAILING_SLASH.replace(&model, "").into_owned();
    }
    model = RE_SAMSUNG.replace(&model, "$1").into_owned();
    model = RE_ORANGE.replace(&model, "ORANGE").into_owned();
    model = RE_LG.replace(&model, "$1").into_owned();
    model = RE_SERIAL.replace_all(&model, "").into_owned();

    let model = model.trim();
    if model.is_empty() {
        None
    } else {
        Some(model.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_from_number() {
        assert_eq!(
            android_version("Mozilla/5.0 (Linux; U; Android 2.2; HTC Desire Build/FRF91)"),
            Some("2.2")
        );
    }

    #[test]
    fn version_from_release_name() {
        assert_eq!(android_version("Mozilla/5.0 (Linux; U; Android Froyo; xx)"), Some("2.2"));
        assert_eq!(android_version("Mozilla/5.0 (Linux; U; Android Eclair)"), Some("2.1"));
        assert_eq!(android_version("Mozilla/5.0 (Linux; Android Gingerbread.1)"), Some("2.3"));
    }

    #[test]
    fn unknown_version_falls_back() {
        assert_eq!(android_version("Mozilla/5.0 (Linux; U; Android 9.9)"), None);
        assert_eq!(android_version_or_default("Mozilla/5.0 (Linux; U; Android 9.9)"), "2.0");
    }

    #[test]
    fn opera_version() {
        assert_eq!(opera_on_android_version("Opera/9.80 (Android 2.2; Opera Mobi/ADR) Version/11.00"), "11");
        assert_eq!(opera_on_android_version("Opera/9.80 (Android 2.2; Opera Mobi/ADR)"), "10");
        assert_eq!(opera_on_android_version("Opera/9.80 Version/12.00"), "10");
    }

    #[test]
    fn model_htc_is_normalized() {
        let ua = "Mozilla/5.0 (Linux; U; Android 2.1; HTC Hero Build/ERE27) AppleWebKit/530.17";
        assert_eq!(android_model(ua).as_deref(), Some("HTC~Hero"));

        let ua = "Mozilla/5.0 (Linux; U; Android 2.2; HTC_DesireHD_A9191 V1.23 Build/FRG83D)";
        assert_eq!(android_model(ua).as_deref(), Some("HTC~DesireHD_A9191"));
    }

    #[test]
    fn model_vendor_suffixes_are_removed() {
        let ua = "Mozilla/5.0 (Linux; U; Android 2.2; SAMSUNG-GT-I9000/XXJPO Build/FROYO)";
        assert_eq!(android_model(ua).as_deref(), Some("SAMSUNG-GT-I9000"));

        let ua = "Mozilla/5.0 (Linux; U; Android 2.1; LG-P500/V10a Build/FRG83)";
        assert_eq!(android_model(ua).as_deref(), Some("LG-P500"));

        let ua = "Mozilla/5.0 (Linux; U; Android 2.1; ORANGE/San Francisco Build/ERE27)";
        assert_eq!(android_model(ua).as_deref(), Some("ORANGE"));
    }

    #[test]
    fn model_requires_segment_after_version() {
        let with_locale = "Mozilla/5.0 (Linux; U; Android 2.1; de-de; HTC Hero Build/ERE27)";
        assert_eq!(android_model(with_locale), None);
        assert_eq!(android_model("Mozilla/5.0 (Linux; U; Android 1.5; Build/CRB43)"), None);
        assert_eq!(android_model("FOO"), None);
    }
}

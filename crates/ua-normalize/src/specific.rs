//! Family-specific stages.
//!
//! Each stage either reduces a recognized user agent to the part that
//! identifies its family and version, or prefixes it with a computed key
//! followed by [`RIS_DELIMITER`]. Unrecognized input passes through.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::android::{android_model, android_version};
use crate::text::{contains_any, find_from, take_chars};
use crate::RIS_DELIMITER;

static RE_ANDROID_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Android)[ \-](\d\.\d)([^; /\)]+)").unwrap());

static RE_FIREFOX_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Firefox/\d+\.\d+").unwrap());

static RE_HTC_MAC_MODEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(HTC[^;\)]+)").unwrap());

static RE_HTC_MAC_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ _\-/]").unwrap());

static RE_LGUPLUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Mozilla.*(Windows (?:NT|CE)).*(POLARIS|WV).*lgtelecom;.*;([^;]*);.*").unwrap()
});

static RE_OPERA_FAKE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Opera/9\.80\b").unwrap());

static RE_OPERA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Version/(\d+\.\d+)").unwrap());

static RE_SAFARI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Mozilla/5\.0.*U;)(?:.*)(Safari/\d{0,3})(?:.*)").unwrap()
});

static RE_WEBOS_MODEL: Lazy<Regex> = Lazy::new(|| Regex::new(r" ([^/]+)/([\d\.]+)$").unwrap());

static RE_WEBOS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:hpw|web)OS.(\d)\.").unwrap());

/// Browsers whose Android user agents are matched on their own tokens.
const ANDROID_SKIP_PREFIX: &[&str] = &[
    "Opera Mini",
    "Opera Mobi",
    "Opera Tablet",
    "Fennec",
    "Firefox",
    "UCWEB7",
    "NetFrontLifeBrowser/2.2",
];

/// Collapses the Android version to `major.minor` and prefixes
/// `"<version> <model>---"` when both can be read.
pub fn android(ua: &str) -> String {
    let ua = RE_ANDROID_VERSION.replace_all(ua, "$1 $2");
    if ua.contains(RIS_DELIMITER) || contains_any(&ua, ANDROID_SKIP_PREFIX) {
        return ua.into_owned();
    }
    match (android_model(&ua), android_version(&ua)) {
        (Some(model), Some(version)) => format!("{version} {model}{RIS_DELIMITER}{ua}"),
        _ => ua.into_owned(),
    }
}

/// Reduces to `Chrome/<major>`.
pub fn chrome(ua: &str) -> String {
    match ua.find("Chrome") {
        Some(start) if start > 0 => match find_from(ua, ".", start) {
            Some(end) => ua[start..end].to_string(),
            None => ua[start..].to_string(),
        },
        _ => ua.to_string(),
    }
}

/// Reduces to `Firefox/<major>.<minor>`.
pub fn firefox(ua: &str) -> String {
    let ua = match ua.find("Firefox") {
        Some(index) if index > 0 => &ua[index..],
        _ => ua,
    };
    match RE_FIREFOX_VERSION.find(ua) {
        Some(m) => m.as_str().to_string(),
        None => ua.to_string(),
    }
}

/// Prefixes HTC devices that report a Macintosh desktop user agent.
pub fn htc_mac(ua: &str) -> String {
    if ua.contains(RIS_DELIMITER) {
        return ua.to_string();
    }
    match htc_mac_model(ua) {
        Some(model) => format!("{model}{RIS_DELIMITER}{ua}"),
        None => ua.to_string(),
    }
}

/// The `HTC...` token with separators replaced by `~`.
pub fn htc_mac_model(ua: &str) -> Option<String> {
    let caps = RE_HTC_MAC_MODEL.captures(ua)?;
    Some(RE_HTC_MAC_SEPARATOR.replace_all(&caps[1], "~").into_owned())
}

/// Prefixes Kindle Fire user agents the same way as Android.
pub fn kindle(ua: &str) -> String {
    if ua.contains(RIS_DELIMITER) || !(ua.contains("Android") && ua.contains("Kindle Fire")) {
        return ua.to_string();
    }
    match (android_model(ua), android_version(ua)) {
        (Some(model), Some(version)) => format!("{version} {model}{RIS_DELIMITER}{ua}"),
        _ => ua.to_string(),
    }
}

/// Keeps the ten characters starting at `Konqueror`.
pub fn konqueror(ua: &str) -> String {
    match ua.find("Konqueror") {
        Some(index) if index > 0 => take_chars(ua, index, 10).to_string(),
        _ => ua.to_string(),
    }
}

/// Cuts everything before the `LG` token.
pub fn lg(ua: &str) -> String {
    match ua.find("LG") {
        Some(index) if index > 0 => ua[index..].to_string(),
        _ => ua.to_string(),
    }
}

/// Rewrites LG U+ carrier user agents to `<model> <os> <browser>`.
pub fn lguplus(ua: &str) -> String {
    RE_LGUPLUS.replace(ua, "${3} ${1} ${2}").into_owned()
}

/// Reduces to `MSIE x.y`.
pub fn msie(ua: &str) -> String {
    match ua.find("MSIE") {
        Some(index) if index > 0 => take_chars(ua, index, 8).to_string(),
        _ => ua.to_string(),
    }
}

/// Replaces the frozen `Opera/9.80` token with the real `Version/x.y`.
pub fn opera(ua: &str) -> String {
    if !RE_OPERA_FAKE_VERSION.is_match(ua) {
        return ua.to_string();
    }
    match RE_OPERA_VERSION.captures(ua) {
        Some(caps) => format!("Opera/{}{}", &caps[1], &ua["Opera/9.80".len()..]),
        None => ua.to_string(),
    }
}

/// Reduces to `Mozilla/5.0 (<platform>; U; Safari/<major>`.
pub fn safari(ua: &str) -> String {
    RE_SAFARI.replace(ua, "${1} ${2}").into_owned()
}

/// Prefixes `"<model> <version> webOS<major>---"`.
pub fn webos(ua: &str) -> String {
    if ua.contains(RIS_DELIMITER) {
        return ua.to_string();
    }
    match (webos_model_version(ua), webos_version(ua)) {
        (Some(model), Some(os)) => format!("{model} {os}{RIS_DELIMITER}{ua}"),
        _ => ua.to_string(),
    }
}

/// Trailing `Model/x.y` token, e.g. `Pre 3.0` or `TouchPad 1.0`.
pub fn webos_model_version(ua: &str) -> Option<String> {
    let caps = RE_WEBOS_MODEL.captures(ua)?;
    Some(format!("{} {}", &caps[1], &caps[2]))
}

/// `webOS<major>` from either `webOS/x.y` or `hpwOS/x.y`.
pub fn webos_version(ua: &str) -> Option<String> {
    let caps = RE_WEBOS_VERSION.captures(ua)?;
    Some(format!("webOS{}", &caps[1]))
}

//! Last handler of the chain and the shared catch-all recovery.

use once_cell::sync::Lazy;
use regex::Regex;
use ua_common::ids::{GENERIC_MOBILE, GENERIC_WEB_BROWSER, GENERIC_XHTML};

use super::{exact_in, ris_in, utils, Handler, MatchContext, UserAgent};

const MOZILLA_TOLERANCE: usize = 5;
pub const MOZILLA4_BUCKET: &str = "catch_all_mozilla4";
pub const MOZILLA5_BUCKET: &str = "catch_all_mozilla5";

/// Ordered substring table for mobile agents no family handler claimed.
const MOBILE_CATCH_ALL_IDS: &[(&str, &str)] = &[
    // Openwave
    ("UP.Browser/7.2", "opwv_v72_generic"),
    ("UP.Browser/7", "opwv_v7_generic"),
    ("UP.Browser/6.2", "opwv_v62_generic"),
    ("UP.Browser/6", "opwv_v6_generic"),
    ("UP.Browser/5", "upgui_generic"),
    ("UP.Browser/4", "uptext_generic"),
    ("UP.Browser/3", "uptext_generic"),
    ("Series60", "nokia_generic_series60"),
    // Access NetFront
    ("NetFront/3.0", "generic_netfront_ver3"),
    ("ACS-NF/3.0", "generic_netfront_ver3"),
    ("NetFront/3.1", "generic_netfront_ver3_1"),
    ("ACS-NF/3.1", "generic_netfront_ver3_1"),
    ("NetFront/3.2", "generic_netfront_ver3_2"),
    ("ACS-NF/3.2", "generic_netfront_ver3_2"),
    ("NetFront/3.3", "generic_netfront_ver3_3"),
    ("ACS-NF/3.3", "generic_netfront_ver3_3"),
    ("NetFront/3.4", "generic_netfront_ver3_4"),
    ("NetFront/3.5", "generic_netfront_ver3_5"),
    ("NetFront/4.0", "generic_netfront_ver4_0"),
    ("NetFront/4.1", "generic_netfront_ver4_1"),
    ("CoreMedia", "apple_iphone_coremedia_ver1"),
    ("Windows CE", "generic_ms_mobile"),
    ("Obigo", GENERIC_XHTML),
    ("AU-MIC/2", GENERIC_XHTML),
    ("AU-MIC-", GENERIC_XHTML),
    ("AU-OBIGO/", GENERIC_XHTML),
    ("Teleca Q03B1", GENERIC_XHTML),
    ("Opera Mini/1", "generic_opera_mini_version1"),
    ("Opera Mini/2", "generic_opera_mini_version2"),
    ("Opera Mini/3", "generic_opera_mini_version3"),
    ("Opera Mini/4", "generic_opera_mini_version4"),
    ("Opera Mini/5", "generic_opera_mini_version5"),
    ("DoCoMo", "docomo_generic_jap_ver1"),
    ("KDDI", "docomo_generic_jap_ver1"),
];

static RE_DESKTOP_SAFARI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^Mozilla/5\.0 \((?:Macintosh|Windows)[^\)]+\) AppleWebKit/[\d\.]+ \(KHTML, like Gecko\) Version/[\d\.]+ Safari/[\d\.]+$",
    )
    .unwrap()
});

static RE_MSIE9_DESKTOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Mozilla/5\.0 \(compatible; MSIE 9\.0; Windows NT \d\.\d").unwrap()
});

static RE_MSIE_DESKTOP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Mozilla/4\.0 \(compatible; MSIE \d\.\d; Windows NT \d\.\d").unwrap()
});

/// Thorough desktop-browser test.
///
/// `agent` supplies the keyword flags; `ua` is the string the signature
/// checks run on.
pub fn is_desktop_heavy_duty(agent: &UserAgent, ua: &str) -> bool {
    if agent.is_smart_tv() {
        return false;
    }
    if ua.contains("Chrome") && !ua.contains("Ventana") {
        return true;
    }
    if agent.is_mobile() {
        return false;
    }
    // PowerPC is not always mobile, but it is not worth the risk.
    if ua.contains("PPC") {
        return false;
    }
    if ua.contains("Firefox") && !ua.contains("Tablet") {
        return true;
    }
    if RE_DESKTOP_SAFARI.is_match(ua) {
        return true;
    }
    if utils::starts_with_any(ua, &["Opera/9.80 (Windows NT", "Opera/9.80 (Macintosh"]) {
        return true;
    }
    if agent.is_desktop() {
        return true;
    }
    RE_MSIE9_DESKTOP.is_match(ua) || RE_MSIE_DESKTOP.is_match(ua)
}

/// First id of the mobile catch-all table whose key `ua` contains.
pub fn mobile_catch_all_id(ua: &str) -> Option<&'static str> {
    MOBILE_CATCH_ALL_IDS
        .iter()
        .find(|(key, _)| ua.contains(key))
        .map(|(_, id)| *id)
}

/// Recovery shared by every handler once its own steps gave nothing.
pub fn recover(agent: &UserAgent, ua: &str) -> Option<String> {
    if is_desktop_heavy_duty(agent, ua) {
        return Some(GENERIC_WEB_BROWSER.to_string());
    }
    if !agent.is_desktop() {
        if let Some(id) = mobile_catch_all_id(ua) {
            return Some(id.to_string());
        }
    }
    if agent.is_mobile() {
        return Some(GENERIC_MOBILE.to_string());
    }
    if agent.is_desktop() {
        return Some(GENERIC_WEB_BROWSER.to_string());
    }
    None
}

/// Accepts every user agent.
pub struct CatchAll;

impl CatchAll {
    fn mozilla_bucket(ua: &str) -> Option<&'static str> {
        if ua.starts_with("Mozilla/5") {
            Some(MOZILLA5_BUCKET)
        } else if ua.starts_with("Mozilla/4") {
            Some(MOZILLA4_BUCKET)
        } else {
            None
        }
    }
}

impl Handler for CatchAll {
    fn name(&self) -> &'static str {
        "catch_all"
    }

    fn can_handle(&self, _ua: &UserAgent) -> bool {
        true
    }

    fn secondary_bucket(&self, normalized: &str) -> Option<&'static str> {
        Self::mozilla_bucket(normalized)
    }

    fn exact(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let index = ctx.index();
        ctx.exact(ua)
            .or_else(|| exact_in(index.bucket(MOZILLA4_BUCKET), ua))
            .or_else(|| exact_in(index.bucket(MOZILLA5_BUCKET), ua))
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if !ua.starts_with("Mozilla") {
            return ris_in(ctx.bucket, ua, utils::first_slash(ua));
        }
        let bucket = match Self::mozilla_bucket(ua) {
            Some(name) => ctx.index().bucket(name),
            None => ctx.bucket,
        };
        ctx.ld_in(bucket, ua, MOZILLA_TOLERANCE)
    }
}

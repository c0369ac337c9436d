//! Handlers keyed on a platform rather than a handset vendor.

use once_cell::sync::Lazy;
use regex::Regex;
use ua_normalize::android::{android_version_or_default, opera_on_android_version};
use ua_normalize::{Stage, RIS_DELIMITER};

use super::{utils, Handler, MatchContext, UserAgent};

/// RIS tolerance just past a normalizer prefix, if there is one.
fn past_delimiter(ua: &str) -> Option<usize> {
    utils::end_of(ua, RIS_DELIMITER)
}

fn known(id: String, ids: &[&str], fallback: &str) -> String {
    if ids.contains(&id.as_str()) {
        id
    } else {
        fallback.to_string()
    }
}

// ============================================================================
// Java midlets and smart TVs
// ============================================================================

pub struct JavaMidlet;

impl Handler for JavaMidlet {
    fn name(&self) -> &'static str {
        "java_midlet"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.contains("UNTRUSTED/1.0")
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("generic_midp_midlet".to_string())
    }
}

pub struct SmartTv;

impl Handler for SmartTv {
    fn name(&self) -> &'static str {
        "smart_tv"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.is_smart_tv()
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.ris(ua, ua.len())
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.contains("SmartTV") {
            "generic_smarttv_browser"
        } else if ua.contains("GoogleTV") {
            "generic_smarttv_googletv_browser"
        } else if ua.contains("AppleTV") {
            "generic_smarttv_appletv_browser"
        } else if ua.contains("Boxee") {
            "generic_smarttv_boxeebox_browser"
        } else {
            "generic_smarttv_browser"
        };
        Some(id.to_string())
    }
}

// ============================================================================
// Amazon and LG U+
// ============================================================================

pub struct Kindle;

impl Handler for Kindle {
    fn name(&self) -> &'static str {
        "kindle"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.contains_any(&["Kindle", "Silk"])
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Kindle)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        // Kindle/1 to Kindle/3 are matched up to and including the major.
        if let Some(version_at) = utils::end_of(ua, "Kindle/") {
            if matches!(ua.as_bytes().get(version_at), Some(b'1'..=b'3')) {
                return ctx.ris(ua, version_at + 1);
            }
        }
        past_delimiter(ua).and_then(|tolerance| ctx.ris(ua, tolerance))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.contains("Kindle/1") {
            "amazon_kindle_ver1"
        } else if ua.contains("Kindle/2") {
            "amazon_kindle2_ver1"
        } else if ua.contains("Kindle/3") {
            "amazon_kindle3_ver1"
        } else if utils::contains_any(ua, &["Kindle Fire", "Silk"]) {
            "amazon_kindle_fire_ver1"
        } else {
            "generic_amazon_kindle"
        };
        Some(id.to_string())
    }
}

const LGUPLUS_IDS: &[(&str, &[&str])] = &[
    ("generic_lguplus_rexos_facebook_browser", &["Windows NT 5", "POLARIS"]),
    ("generic_lguplus_rexos_webviewer_browser", &["Windows NT 5"]),
    ("generic_lguplus_winmo_facebook_browser", &["Windows CE", "POLARIS"]),
    ("generic_lguplus_android_webkit_browser", &["Android", "AppleWebKit"]),
];

pub struct LgUplus;

impl Handler for LgUplus {
    fn name(&self) -> &'static str {
        "lguplus"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains_any(&["LGUPLUS", "lgtelecom"])
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::LgUplus)
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        None
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        LGUPLUS_IDS
            .iter()
            .find(|(_, needles)| utils::contains_all(ua, needles))
            .map(|(id, _)| id.to_string())
    }
}

// ============================================================================
// Android
// ============================================================================

const ANDROID_IDS: &[&str] = &[
    "generic_android",
    "generic_android_ver1_5",
    "generic_android_ver1_6",
    "generic_android_ver2",
    "generic_android_ver2_1",
    "generic_android_ver2_2",
    "generic_android_ver2_3",
    "generic_android_ver3_0",
    "generic_android_ver3_1",
    "generic_android_ver3_2",
    "generic_android_ver3_3",
    "generic_android_ver4",
    "generic_android_ver4_1",
    "uabait_opera_mini_android_v50",
    "uabait_opera_mini_android_v51",
    "generic_opera_mini_android_version5",
    "generic_android_ver1_5_opera_mobi",
    "generic_android_ver1_5_opera_mobi_11",
    "generic_android_ver1_6_opera_mobi",
    "generic_android_ver1_6_opera_mobi_11",
    "generic_android_ver2_0_opera_mobi",
    "generic_android_ver2_0_opera_mobi_11",
    "generic_android_ver2_1_opera_mobi",
    "generic_android_ver2_1_opera_mobi_11",
    "generic_android_ver2_2_opera_mobi",
    "generic_android_ver2_2_opera_mobi_11",
    "generic_android_ver2_3_opera_mobi",
    "generic_android_ver2_3_opera_mobi_11",
    "generic_android_ver4_0_opera_mobi",
    "generic_android_ver4_0_opera_mobi_11",
    "generic_android_ver2_1_opera_tablet",
    "generic_android_ver2_2_opera_tablet",
    "generic_android_ver2_3_opera_tablet",
    "generic_android_ver3_0_opera_tablet",
    "generic_android_ver3_1_opera_tablet",
    "generic_android_ver3_2_opera_tablet",
    "generic_android_ver2_0_fennec",
    "generic_android_ver2_0_fennec_tablet",
    "generic_android_ver2_0_fennec_desktop",
    "generic_android_ver1_6_ucweb",
    "generic_android_ver2_0_ucweb",
    "generic_android_ver2_1_ucweb",
    "generic_android_ver2_2_ucweb",
    "generic_android_ver2_3_ucweb",
    "generic_android_ver2_0_netfrontlifebrowser",
    "generic_android_ver2_1_netfrontlifebrowser",
    "generic_android_ver2_2_netfrontlifebrowser",
    "generic_android_ver2_3_netfrontlifebrowser",
];

/// Opera Mini on Android prefixes without a build token, with the id used
/// when the prefix search finds nothing.
const OPERA_MINI_PREFIXES: &[(&str, &str)] = &[
    ("Opera/9.80 (J2ME/MIDP; Opera Mini/5", "uabait_opera_mini_android_v50"),
    ("Opera/9.80 (Android; Opera Mini/5.0", "uabait_opera_mini_android_v50"),
    ("Opera/9.80 (Android; Opera Mini/5.1", "uabait_opera_mini_android_v51"),
];

fn android_version_token(ua: &str) -> String {
    android_version_or_default(ua).replace('.', "_")
}

pub struct Android;

impl Handler for Android {
    fn name(&self) -> &'static str {
        "android"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("Android")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Android)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if let Some(tolerance) = past_delimiter(ua) {
            return ctx.ris(ua, tolerance);
        }

        if ua.contains("Opera Mini") {
            if ua.contains(" Build/") {
                return ctx.ris(ua, utils::index_of_or_length(ua, " Build/", 0));
            }
            if let Some((prefix, default_id)) = OPERA_MINI_PREFIXES
                .iter()
                .find(|(prefix, _)| ua.starts_with(prefix))
            {
                return ctx
                    .ris(ua, prefix.len())
                    .or_else(|| Some(default_id.to_string()));
            }
        }

        if utils::contains_any(ua, &["Opera Mobi", "Opera Tablet"]) {
            return ctx.ris(ua, utils::second_slash(ua));
        }

        if utils::contains_any(ua, &["Fennec", "Firefox"]) {
            return ctx.ris(ua, utils::index_of_or_length(ua, ")", 0));
        }

        for token in ["UCWEB7", "NetFrontLifeBrowser/2.2"] {
            if let Some(tolerance) = utils::end_of(ua, token) {
                return ctx.ris(ua, tolerance);
            }
        }

        let tolerance = utils::index_of_or_length(ua, " Build/", 0)
            .min(utils::index_of_or_length(ua, " AppleWebKit", 0));
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if ua.contains("Opera Mini") {
            return Some("generic_opera_mini_android_version5".to_string());
        }

        if ua.contains("Opera Mobi") {
            let mut id = format!("generic_android_ver{}_opera_mobi", android_version_token(ua));
            let opera = opera_on_android_version(ua);
            // Opera Mobile 10 ids carry no browser version.
            if opera != "10" {
                id.push('_');
                id.push_str(opera);
            }
            return Some(known(id, ANDROID_IDS, "generic_android_ver2_0_opera_mobi"));
        }

        if ua.contains("Opera Tablet") {
            let version: f64 = android_version_or_default(ua).parse().unwrap_or(2.1);
            let version = version.clamp(2.1, 3.2);
            let id = format!(
                "generic_android_ver{}_opera_tablet",
                format!("{version:.1}").replace('.', "_")
            );
            return Some(known(id, ANDROID_IDS, "generic_android_ver2_1_opera_tablet"));
        }

        if ua.contains("UCWEB7") {
            let id = format!("generic_android_ver{}_ucweb", android_version_token(ua));
            return Some(known(id, ANDROID_IDS, "generic_android_ver2_0_ucweb"));
        }

        let fennec = ua.contains("Fennec");
        let firefox = ua.contains("Firefox");
        if fennec || firefox {
            let id = if fennec || ua.contains("Mobile") {
                "generic_android_ver2_0_fennec"
            } else if ua.contains("Tablet") {
                "generic_android_ver2_0_fennec_tablet"
            } else if ua.contains("Desktop") {
                "generic_android_ver2_0_fennec_desktop"
            } else {
                return None;
            };
            return Some(id.to_string());
        }

        if ua.contains("NetFrontLifeBrowser") {
            let id = format!(
                "generic_android_ver{}_netfrontlifebrowser",
                android_version_token(ua)
            );
            return Some(known(id, ANDROID_IDS, "generic_android_ver2_0_netfrontlifebrowser"));
        }

        if ua.contains("Froyo") {
            return Some("generic_android_ver2_2".to_string());
        }

        let id = match android_version_token(ua).as_str() {
            "2_0" => "generic_android_ver2".to_string(),
            "4_0" => "generic_android_ver4".to_string(),
            token => format!("generic_android_ver{token}"),
        };
        Some(known(id, ANDROID_IDS, "generic_android"))
    }
}

// ============================================================================
// Apple
// ============================================================================

static RE_IOS_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r" (\d)_(\d)[ _]").unwrap());

pub struct Apple;

impl Handler for Apple {
    fn name(&self) -> &'static str {
        "apple"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with("Mozilla/5") && ua.contains_any(&["iPhone", "iPod", "iPad"])
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let tolerance = match ua.find('_') {
            Some(idx) => idx + 1,
            None => ua
                .find("like Mac OS X;")
                .map(|idx| idx + "like Mac OS X;".len())
                .unwrap_or(ua.len()),
        };
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let major = RE_IOS_VERSION
            .captures(ua)
            .and_then(|caps| caps[1].parse::<u8>().ok());

        // iPods also say iPhone.
        let id = if ua.contains("iPod") {
            match major {
                Some(v @ 1..=5) => format!("apple_ipod_touch_ver{v}"),
                _ => "apple_ipod_touch_ver1".to_string(),
            }
        } else if ua.contains("iPad") {
            match major {
                Some(5) => "apple_ipad_ver1_sub5",
                Some(4) => "apple_ipad_ver1_sub42",
                _ => "apple_ipad_ver1",
            }
            .to_string()
        } else if ua.contains("iPhone") {
            match major {
                Some(v @ 1..=5) => format!("apple_iphone_ver{v}"),
                _ => "apple_iphone_ver1".to_string(),
            }
        } else {
            return None;
        };
        Some(id)
    }
}

// ============================================================================
// Windows Phone
// ============================================================================

pub struct WindowsPhoneDesktop;

impl Handler for WindowsPhoneDesktop {
    fn name(&self) -> &'static str {
        "windows_phone_desktop"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.contains("ZuneWP7")
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        None
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.contains("Trident/5.0") {
            "generic_ms_phone_os7_5_desktopmode"
        } else {
            "generic_ms_phone_os7_desktopmode"
        };
        Some(id.to_string())
    }
}

pub struct WindowsPhone;

impl Handler for WindowsPhone {
    fn name(&self) -> &'static str {
        "windows_phone"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("Windows Phone")
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        None
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        [
            ("Windows Phone 6.5", "generic_ms_winmo6_5"),
            ("Windows Phone OS 7.0", "generic_ms_phone_os7"),
            ("Windows Phone OS 7.5", "generic_ms_phone_os7_5"),
        ]
        .iter()
        .find(|(needle, _)| ua.contains(needle))
        .map(|(_, id)| id.to_string())
    }
}

// ============================================================================
// Nokia Ovi, HTC on Mac, webOS, Opera Mini
// ============================================================================

pub struct NokiaOviBrowser;

impl Handler for NokiaOviBrowser {
    fn name(&self) -> &'static str {
        "nokia_ovi_browser"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("S40OviBrowser")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let idx = ua.find("Nokia")?;
        ctx.ris(ua, utils::index_of_any_or_length(ua, &["/", " "], idx))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("nokia_generic_series40_ovibrosr".to_string())
    }
}

pub struct HtcMac;

impl Handler for HtcMac {
    fn name(&self) -> &'static str {
        "htc_mac"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.starts_with("Mozilla/5.0 (Macintosh") && ua.contains("HTC")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::HtcMac)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        past_delimiter(ua).and_then(|tolerance| ctx.ris(ua, tolerance))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("generic_android_htc_disguised_as_mac".to_string())
    }
}

pub struct WebOs;

impl Handler for WebOs {
    fn name(&self) -> &'static str {
        "webos"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains_any(&["webOS", "hpwOS"])
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::WebOs)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        past_delimiter(ua).and_then(|tolerance| ctx.ris(ua, tolerance))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.contains("hpwOS/3") {
            "hp_tablet_webos_generic"
        } else {
            "hp_webos_generic"
        };
        Some(id.to_string())
    }
}

pub struct OperaMini;

impl Handler for OperaMini {
    fn name(&self) -> &'static str {
        "opera_mini"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        ua.contains("Opera Mini")
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = (1..=5)
            .find(|v| ua.contains(&format!("Opera Mini/{v}")))
            .map(|v| format!("generic_opera_mini_version{v}"))
            .unwrap_or_else(|| {
                if ua.contains("Opera Mobi") {
                    "generic_opera_mini_version4".to_string()
                } else {
                    "generic_opera_mini_version1".to_string()
                }
            });
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recover(handler: &dyn Handler, ua: &str) -> Option<String> {
        let repo = crate::repository::tests_support::minimal();
        let ctx = MatchContext::new(&repo, handler.name(), ua_config::MatchMode::Accuracy);
        handler.recovery(&ctx, ua)
    }

    #[test]
    fn android_recovery_ids() {
        let cases = [
            ("Mozilla/5.0 (Linux; U; Android 2.2; Nexus One Build/FRF91) AppleWebKit/533.1", "generic_android_ver2_2"),
            ("Mozilla/5.0 (Linux; U; Android 2.0; Droid Build/ESD20) AppleWebKit/530.17", "generic_android_ver2"),
            ("Mozilla/5.0 (Linux; U; Android 4.0.3; GT-I9100 Build/IML74K) AppleWebKit/534.30", "generic_android_ver4"),
            ("Mozilla/5.0 (Linux; U; Android 9.9; X Build/1) AppleWebKit/534.30", "generic_android_ver2"),
            ("Opera/9.80 (Android 2.3.3; Linux; Opera Mobi/ADR-1111101157; U) Presto/2.9.201 Version/11.50", "generic_android_ver2_3_opera_mobi_11"),
            ("Opera/9.80 (Android 2.2; Linux; Opera Mobi/8745; U) Presto/2.7.60 Version/10.5", "generic_android_ver2_2_opera_mobi"),
            ("Opera/9.80 (Android 3.2.1; Linux; Opera Tablet/ADR-1109081720; U) Presto/2.8.149 Version/11.10", "generic_android_ver3_2_opera_tablet"),
            ("Opera/9.80 (Android 4.0.4; Linux; Opera Tablet/ADR-1205181138; U) Presto/2.10.254 Version/12.00", "generic_android_ver3_2_opera_tablet"),
            ("Mozilla/5.0 (Android; Linux armv7l; rv:10.0) Gecko/20120129 Firefox/10.0 Fennec/10.0", "generic_android_ver2_0_fennec"),
            ("Mozilla/5.0 (Android; Tablet; rv:10.0) Gecko/10.0 Firefox/10.0", "generic_android_ver2_0_fennec_tablet"),
            ("JUC (Linux; U; Android 2.2; HTC Desire) UCWEB7.9.0.94/139/800", "generic_android_ver2_2_ucweb"),
            ("Opera/9.80 (J2ME/MIDP; Opera Mini/5.0.18741/18.678; U; Android) Presto/2.4.15", "generic_opera_mini_android_version5"),
        ];
        for (ua, expected) in cases {
            assert_eq!(recover(&Android, ua).as_deref(), Some(expected), "ua: {ua}");
        }
        assert_eq!(recover(&Android, "Mozilla/5.0 (Android; rv:10.0) Firefox/10.0"), None);
    }

    #[test]
    fn apple_recovery_ids() {
        let cases = [
            ("Mozilla/5.0 (iPod; U; CPU iPhone OS 4_3_3 like Mac OS X) AppleWebKit/533.17.9", "apple_ipod_touch_ver4"),
            ("Mozilla/5.0 (iPad; CPU OS 5_0_1 like Mac OS X) AppleWebKit/534.46", "apple_ipad_ver1_sub5"),
            ("Mozilla/5.0 (iPad; U; CPU OS 3_2 like Mac OS X) AppleWebKit/531.21.10", "apple_ipad_ver1"),
            ("Mozilla/5.0 (iPhone; U; CPU iPhone OS 3_1_3 like Mac OS X) AppleWebKit/528.18", "apple_iphone_ver3"),
            ("Mozilla/5.0 (iPhone; CPU iPhone OS 7_0 like Mac OS X) AppleWebKit/537.51", "apple_iphone_ver1"),
        ];
        for (ua, expected) in cases {
            assert_eq!(recover(&Apple, ua).as_deref(), Some(expected), "ua: {ua}");
        }
    }

    #[test]
    fn platform_recovery_ids() {
        assert_eq!(recover(&Kindle, "Mozilla/5.0 (Linux; U) Kindle/3.0 (screen 600x800)").as_deref(), Some("amazon_kindle3_ver1"));
        assert_eq!(recover(&Kindle, "Mozilla/5.0 (Linux; U; en-us; KFTT Build/IML74K) Silk/2.1").as_deref(), Some("amazon_kindle_fire_ver1"));
        assert_eq!(recover(&WebOs, "Mozilla/5.0 (hp-tablet; Linux; hpwOS/3.0.5; U) TouchPad/1.0").as_deref(), Some("hp_tablet_webos_generic"));
        assert_eq!(recover(&WindowsPhone, "Mozilla/5.0 (compatible; MSIE 9.0; Windows Phone OS 7.5; Trident/5.0)").as_deref(), Some("generic_ms_phone_os7_5"));
        assert_eq!(recover(&WindowsPhone, "Windows Phone 8"), None);
        assert_eq!(recover(&OperaMini, "Opera/9.80 (J2ME/MIDP; Opera Mini/4.2.14912/870; U) Presto/2.4.15").as_deref(), Some("generic_opera_mini_version4"));
        assert_eq!(recover(&OperaMini, "Opera Mini").as_deref(), Some("generic_opera_mini_version1"));
        assert_eq!(recover(&SmartTv, "Mozilla/5.0 (X11; Linux i686) GoogleTV/b39389").as_deref(), Some("generic_smarttv_googletv_browser"));
        assert_eq!(recover(&LgUplus, "Mozilla/4.0 (compatible; MSIE 6.0; Windows CE; POLARIS 6.1; lgtelecom)").as_deref(), Some("generic_lguplus_winmo_facebook_browser"));
    }
}

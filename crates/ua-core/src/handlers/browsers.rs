//! Desktop browsers, robots and transcoders.
//!
//! Browser handlers only claim user agents without a mobile keyword; the
//! mobile builds of the same engines belong to the platform handlers.

use once_cell::sync::Lazy;
use regex::Regex;
use ua_common::ids::GENERIC_WEB_CRAWLER;
use ua_normalize::Stage;

use super::{utils, Handler, MatchContext, UserAgent};

/// Lowercase fragments that mark robots, crawlers and transcoders.
const BOT_KEYWORDS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "novarra",
    "transcoder",
    "yahoo! searchmonkey",
    "yahoo! slurp",
    "feedfetcher-google",
    "toolbar",
    "mowser",
    "mediapartners-google",
    "azureus",
    "inquisitor",
    "baiduspider",
    "baidumobaider",
    "holmes/",
    "libwww-perl",
    "netsprint",
    "yandex",
    "cfnetwork",
    "ineturl",
    "jakarta",
    "lorkyll",
    "microsoft url control",
    "indy library",
    "slurp",
    "crawl",
    "wget",
    "ucweblient",
    "rma",
    "snoopy",
    "untrursted",
    "mozfdsilla",
    "ask jeeves",
    "jeeves/teoma",
    "mechanize",
    "http client",
    "servicemonitor",
    "httpunit",
    "hatena",
    "ichiro",
];

pub struct BotCrawlerTranscoder;

impl Handler for BotCrawlerTranscoder {
    fn name(&self) -> &'static str {
        "bot_crawler_transcoder"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        BOT_KEYWORDS.iter().any(|k| ua.lowercase().contains(k))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some(GENERIC_WEB_CRAWLER.to_string())
    }
}

pub struct Chrome;

impl Handler for Chrome {
    fn name(&self) -> &'static str {
        "chrome"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile() && ua.contains("Chrome")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Chrome)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let start = ua.find("Chrome").unwrap_or(0);
        ctx.ris(ua, utils::index_of_or_length(ua, "/", start))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("google_chrome".to_string())
    }
}

static RE_FIREFOX_MAJOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"Firefox/(\d+)\.\d").unwrap());

const FIREFOX_IDS: &[&str] = &[
    "firefox_1",
    "firefox_2",
    "firefox_3",
    "firefox_4_0",
    "firefox_5_0",
    "firefox_6_0",
    "firefox_7_0",
    "firefox_8_0",
    "firefox_9_0",
    "firefox_10_0",
    "firefox_11_0",
    "firefox_12_0",
];

pub struct Firefox;

impl Handler for Firefox {
    fn name(&self) -> &'static str {
        "firefox"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile()
            && !ua.contains_any(&["Tablet", "Sony", "Novarra", "Opera"])
            && ua.contains("Firefox")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Firefox)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.ris(ua, utils::index_of_or_length(ua, ".", 0))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = RE_FIREFOX_MAJOR
            .captures(ua)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .map(|major| {
                if major <= 3 {
                    format!("firefox_{major}")
                } else {
                    format!("firefox_{major}_0")
                }
            })
            .filter(|id| FIREFOX_IDS.contains(&id.as_str()));
        Some(id.unwrap_or_else(|| "firefox".to_string()))
    }
}

static RE_MSIE_COMPATIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Mozilla/4\.0 \(compatible; MSIE (\d)\.(\d);").unwrap());

pub struct Msie;

impl Handler for Msie {
    fn name(&self) -> &'static str {
        "msie"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile()
            && !ua.contains_any(&["Opera", "armv", "MOTO", "BREW"])
            && ua.starts_with("Mozilla")
            && ua.contains("MSIE")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Msie)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let Some(caps) = RE_MSIE_COMPATIBLE.captures(ua) else {
            return ctx.ris(ua, utils::first_slash(ua));
        };
        let id = match (&caps[1], &caps[2]) {
            ("7", _) => "msie_7",
            ("8", _) => "msie_8",
            ("9", _) => "msie_9",
            ("6", _) => "msie_6",
            ("4", _) => "msie_4",
            ("5", "5") => "msie_5_5",
            ("5", _) => "msie_5",
            _ => "msie",
        };
        Some(id.to_string())
    }
}

static RE_OPERA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Opera[ /]?(\d+)\.\d+").unwrap());

const OPERA_IDS: &[&str] = &[
    "opera_7", "opera_8", "opera_9", "opera_10", "opera_11", "opera_12",
];

pub struct Opera;

impl Handler for Opera {
    fn name(&self) -> &'static str {
        "opera"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile() && ua.contains("Opera")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Opera)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let start = ua.find("Opera").unwrap_or(0);
        ctx.ris(ua, utils::index_of_or_length(ua, ".", start))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = RE_OPERA_VERSION
            .captures(ua)
            .map(|caps| format!("opera_{}", &caps[1]))
            .filter(|id| OPERA_IDS.contains(&id.as_str()));
        Some(id.unwrap_or_else(|| "opera".to_string()))
    }
}

pub struct Safari;

impl Handler for Safari {
    fn name(&self) -> &'static str {
        "safari"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile() && ua.starts_with("Mozilla") && ua.contains("Safari")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Safari)
    }
}

pub struct Konqueror;

impl Handler for Konqueror {
    fn name(&self) -> &'static str {
        "konqueror"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_mobile() && ua.contains("Konqueror")
    }

    fn stage(&self) -> Option<Stage> {
        Some(Stage::Konqueror)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ua_config::MatchMode;

    fn handles(handler: &dyn Handler, ua: &str) -> bool {
        handler.can_handle(&UserAgent::new(ua))
    }

    fn recover(handler: &dyn Handler, ua: &str) -> Option<String> {
        let repo = crate::repository::tests_support::minimal();
        let ctx = MatchContext::new(&repo, handler.name(), MatchMode::Accuracy);
        handler.recovery(&ctx, ua)
    }

    #[test]
    fn bots_match_case_insensitively() {
        assert!(handles(&BotCrawlerTranscoder, "Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(handles(&BotCrawlerTranscoder, "NetSprint -- 2.0"));
        assert!(handles(&BotCrawlerTranscoder, "Wget/1.12 (linux-gnu)"));
        assert!(!handles(&BotCrawlerTranscoder, "Nokia6300/2.0 (05.00) Profile/MIDP-2.0"));
        assert_eq!(recover(&BotCrawlerTranscoder, "x").as_deref(), Some("generic_web_crawler"));
    }

    #[test]
    fn mobile_keywords_exclude_browsers() {
        let mobile = "Mozilla/5.0 (iPhone; U; CPU iPhone OS 4_3 like Mac OS X) AppleWebKit/533.17.9 Mobile/8F190 Safari/6533.18.5";
        assert!(!handles(&Safari, mobile));
        assert!(handles(&Safari, "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_6_8) AppleWebKit/534.50 (KHTML, like Gecko) Version/5.1 Safari/534.50"));
        assert!(!handles(&Firefox, "Mozilla/5.0 (Android; Tablet; rv:10.0) Gecko/10.0 Firefox/10.0"));
        assert!(!handles(&Msie, "Opera/9.80 (Windows NT 6.1; U; MSIE 6.0)"));
    }

    #[test]
    fn msie_versions_resolve_without_the_index() {
        let repo = crate::repository::tests_support::minimal();
        let ctx = MatchContext::new(&repo, "msie", MatchMode::Accuracy);
        let cases = [
            ("Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 6.0)", "msie_7"),
            ("Mozilla/4.0 (compatible; MSIE 5.5; Windows 98)", "msie_5_5"),
            ("Mozilla/4.0 (compatible; MSIE 5.0; Windows 98)", "msie_5"),
            ("Mozilla/4.0 (compatible; MSIE 3.0; Windows 95)", "msie"),
        ];
        for (ua, expected) in cases {
            assert_eq!(Msie.conclusive(&ctx, ua).as_deref(), Some(expected), "ua: {ua}");
        }
    }

    #[test]
    fn versioned_recovery_ids() {
        let ff = |ua| recover(&Firefox, ua);
        assert_eq!(ff("Mozilla/5.0 Gecko/20100101 Firefox/3.6").as_deref(), Some("firefox_3"));
        assert_eq!(ff("Mozilla/5.0 Gecko/20100101 Firefox/11.0").as_deref(), Some("firefox_11_0"));
        assert_eq!(ff("Mozilla/5.0 Gecko/20100101 Firefox/19.0").as_deref(), Some("firefox"));

        let opera = |ua| recover(&Opera, ua);
        assert_eq!(opera("Opera/9.80 (Windows NT 6.1; U) Presto/2.9.168 Version/11.50").as_deref(), Some("opera_9"));
        assert_eq!(opera("Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1) Opera 8.54").as_deref(), Some("opera_8"));
        assert_eq!(opera("Opera").as_deref(), Some("opera"));

        assert_eq!(recover(&Chrome, "Chrome/17").as_deref(), Some("google_chrome"));
    }
}

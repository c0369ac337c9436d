//! Handset vendor handlers.
//!
//! Most vendors are recognized by a user-agent prefix and matched by prefix
//! search up to a vendor-specific position; those live in one table. Vendors
//! with edit-distance matching or their own recovery ids get a type each.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{utils, Handler, MatchContext, UserAgent};

/// A vendor with no recovery of its own.
pub struct Vendor {
    name: &'static str,
    recognizes: fn(&UserAgent) -> bool,
    /// Prefix-search tolerance; `None` disables the conclusive step.
    tolerance: fn(&str) -> Option<usize>,
}

impl Handler for Vendor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && (self.recognizes)(ua)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        (self.tolerance)(ua).and_then(|tolerance| ctx.ris(ua, tolerance))
    }
}

fn first_slash(ua: &str) -> Option<usize> {
    Some(utils::first_slash(ua))
}

const SIMPLE: &[Vendor] = &[
    Vendor {
        name: "alcatel",
        recognizes: |ua| ua.starts_with_any(&["Alcatel", "ALCATEL"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "benq",
        recognizes: |ua| ua.starts_with_any(&["BenQ", "BENQ"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "grundig",
        recognizes: |ua| ua.starts_with_any(&["Grundig", "GRUNDIG"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "htc",
        recognizes: |ua| ua.contains_any(&["HTC", "XV6875"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "kyocera",
        recognizes: |ua| ua.starts_with_any(&["kyocera", "QC-", "KWC-"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "mitsubishi",
        recognizes: |ua| ua.starts_with("Mitsu"),
        tolerance: |ua| Some(utils::first_space(ua)),
    },
    Vendor {
        name: "panasonic",
        recognizes: |ua| ua.starts_with("Panasonic"),
        tolerance: first_slash,
    },
    Vendor {
        name: "pantech",
        recognizes: |ua| ua.starts_with_any(&["Pantech", "PT-", "PANTECH", "PG-"]),
        tolerance: |ua| {
            if ua.starts_with("Pantech") {
                Some(5)
            } else {
                Some(utils::first_slash(ua))
            }
        },
    },
    Vendor {
        name: "philips",
        recognizes: |ua| ua.starts_with_any(&["Philips", "PHILIPS"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "qtek",
        recognizes: |ua| ua.starts_with("Qtek"),
        tolerance: first_slash,
    },
    Vendor {
        name: "sagem",
        recognizes: |ua| ua.starts_with_any(&["Sagem", "SAGEM"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "sanyo",
        recognizes: |ua| ua.starts_with_any(&["Sanyo", "SANYO"]) || ua.contains("MobilePhone"),
        tolerance: |ua| match ua.find("MobilePhone") {
            Some(idx) => Some(utils::index_of_or_length(ua, "/", idx)),
            None => Some(utils::first_slash(ua)),
        },
    },
    Vendor {
        name: "sharp",
        recognizes: |ua| ua.starts_with_any(&["Sharp", "SHARP"]),
        tolerance: first_slash,
    },
    Vendor {
        name: "siemens",
        recognizes: |ua| ua.starts_with("SIE-"),
        tolerance: first_slash,
    },
    Vendor {
        name: "spv",
        recognizes: |ua| ua.contains("SPV"),
        tolerance: |ua| {
            let start = ua.find("SPV").unwrap_or(0);
            Some(utils::index_of_or_length(ua, ";", start))
        },
    },
    Vendor {
        name: "toshiba",
        recognizes: |ua| ua.starts_with("Toshiba"),
        tolerance: first_slash,
    },
    Vendor {
        name: "vodafone",
        recognizes: |ua| ua.starts_with("Vodafone"),
        tolerance: first_slash,
    },
];

/// Table vendors named in `names`, in that order.
pub fn simple(names: &[&str]) -> Vec<Box<dyn Handler>> {
    names
        .iter()
        .filter_map(|name| SIMPLE.iter().find(|v| v.name == *name))
        .map(|v| {
            Box::new(Vendor {
                name: v.name,
                recognizes: v.recognizes,
                tolerance: v.tolerance,
            }) as Box<dyn Handler>
        })
        .collect()
}

// ============================================================================
// High-volume vendors
// ============================================================================

pub struct Nokia;

impl Handler for Nokia {
    fn name(&self) -> &'static str {
        "nokia"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("Nokia")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let start = ua.find("Nokia").unwrap_or(0);
        ctx.ris(ua, utils::index_of_any_or_length(ua, &["/", " "], start))
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        [
            ("Series60", "nokia_generic_series60"),
            ("Series80", "nokia_generic_series80"),
            ("MeeGo", "nokia_generic_meego"),
        ]
        .iter()
        .find(|(needle, _)| ua.contains(needle))
        .map(|(_, id)| id.to_string())
    }
}

pub struct Samsung;

impl Handler for Samsung {
    fn name(&self) -> &'static str {
        "samsung"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop()
            && (ua.contains_any(&["Samsung", "SAMSUNG"])
                || ua.starts_with_any(&["SEC-", "SPH", "SGH", "SCH"]))
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let tolerance = if utils::starts_with_any(ua, &["SEC-", "SAMSUNG-", "SCH"]) {
            utils::first_slash(ua)
        } else if utils::starts_with_any(ua, &["Samsung", "SPH", "SGH"]) {
            utils::first_space(ua)
        } else {
            utils::second_slash(ua)
        };
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if ua.starts_with("SAMSUNG") {
            return ctx.ld(ua, 8);
        }
        let start = ua.find("Samsung").unwrap_or(0);
        ctx.ris(ua, utils::index_of_or_length(ua, "/", start))
    }
}

static RE_BLACKBERRY_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"BlackBerry[^/\s]+/(\d.\d)").unwrap());

/// OS version fragments, most specific first.
const BLACKBERRY_IDS: &[(&str, &str)] = &[
    ("2.", "blackberry_generic_ver2"),
    ("3.2", "blackberry_generic_ver3_sub2"),
    ("3.3", "blackberry_generic_ver3_sub30"),
    ("3.5", "blackberry_generic_ver3_sub50"),
    ("3.6", "blackberry_generic_ver3_sub60"),
    ("3.7", "blackberry_generic_ver3_sub70"),
    ("4.1", "blackberry_generic_ver4_sub10"),
    ("4.2", "blackberry_generic_ver4_sub20"),
    ("4.3", "blackberry_generic_ver4_sub30"),
    ("4.5", "blackberry_generic_ver4_sub50"),
    ("4.6", "blackberry_generic_ver4_sub60"),
    ("4.7", "blackberry_generic_ver4_sub70"),
    ("4.", "blackberry_generic_ver4"),
    ("5.", "blackberry_generic_ver5"),
    ("6.", "blackberry_generic_ver6"),
];

pub struct BlackBerry;

impl Handler for BlackBerry {
    fn name(&self) -> &'static str {
        "blackberry"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.lowercase().contains("blackberry")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let tolerance = if ua.starts_with("Mozilla/4") {
            utils::second_slash(ua)
        } else if ua.starts_with("Mozilla/5") {
            utils::ordinal_index_of(ua, ';', 3).unwrap_or(0)
        } else {
            utils::first_slash(ua)
        };
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let caps = RE_BLACKBERRY_VERSION.captures(ua)?;
        let version = caps.get(1)?.as_str();
        BLACKBERRY_IDS
            .iter()
            .find(|(fragment, _)| version.contains(fragment))
            .map(|(_, id)| id.to_string())
    }
}

pub struct SonyEricsson;

impl Handler for SonyEricsson {
    fn name(&self) -> &'static str {
        "sony_ericsson"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("Sony")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let tolerance = if ua.starts_with("SonyEricsson") {
            utils::first_slash(ua).saturating_sub(1)
        } else {
            utils::second_slash(ua)
        };
        ctx.ris(ua, tolerance)
    }
}

pub struct Motorola;

impl Handler for Motorola {
    fn name(&self) -> &'static str {
        "motorola"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop()
            && (ua.starts_with_any(&["Mot-", "MOT-", "MOTO", "moto"]) || ua.contains("Motorola"))
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if utils::starts_with_any(ua, &["Mot-", "MOT-", "Motorola"]) {
            return ctx.ris(ua, utils::first_slash(ua));
        }
        ctx.ld(ua, 5)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        utils::contains_any(ua, &["MIB/2.2", "MIB/BER2.2"]).then(|| "mot_mib22_generic".to_string())
    }
}

// ============================================================================
// Japanese carriers
// ============================================================================

pub struct DoCoMo;

impl Handler for DoCoMo {
    fn name(&self) -> &'static str {
        "docomo"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with("DoCoMo")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        // DoCoMo/2.0 F01A(c100;TB;W24H17) has a single slash.
        let tolerance = utils::ordinal_index_of(ua, '/', 2)
            .unwrap_or_else(|| utils::index_of_or_length(ua, "(", 0));
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.as_bytes().get(7) == Some(&b'2') {
            "docomo_generic_jap_ver2"
        } else {
            "docomo_generic_jap_ver1"
        };
        Some(id.to_string())
    }
}

pub struct Kddi;

impl Handler for Kddi {
    fn name(&self) -> &'static str {
        "kddi"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.contains("KDDI-")
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let tolerance = if ua.starts_with("KDDI/") {
            utils::second_slash(ua)
        } else {
            utils::first_slash(ua)
        };
        ctx.ris(ua, tolerance)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("opwv_v62_generic".to_string())
    }
}

pub struct Nec;

impl Handler for Nec {
    fn name(&self) -> &'static str {
        "nec"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with_any(&["NEC-", "KGT"])
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        if ua.starts_with("NEC-") {
            return ctx.ris(ua, utils::first_slash(ua));
        }
        ctx.ld(ua, 2)
    }
}

// ============================================================================
// Others with their own rules
// ============================================================================

pub struct Lg;

impl Handler for Lg {
    fn name(&self) -> &'static str {
        "lg"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with_any(&["lg", "LG"])
    }

    fn stage(&self) -> Option<ua_normalize::Stage> {
        Some(ua_normalize::Stage::Lg)
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let start = ua.to_uppercase().find("LG").unwrap_or(0);
        ctx.ris(ua, utils::index_of_or_length(ua, "/", start))
    }

    fn recovery(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.ris(ua, 7)
    }
}

fn is_nintendo_ds(ua: &str) -> bool {
    ua.starts_with("Mozilla/") && utils::contains_all(ua, &["Nitro", "Opera"])
}

pub struct Nintendo;

impl Handler for Nintendo {
    fn name(&self) -> &'static str {
        "nintendo"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && (ua.contains("Nintendo") || is_nintendo_ds(ua.as_str()))
    }

    fn conclusive(&self, ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        ctx.ld(ua, 7)
    }

    fn recovery(&self, _ctx: &MatchContext<'_>, ua: &str) -> Option<String> {
        let id = if ua.contains("Nintendo Wii") {
            "nintendo_wii_ver1"
        } else if ua.contains("Nintendo DSi") {
            "nintendo_dsi_ver1"
        } else if is_nintendo_ds(ua) {
            "nintendo_ds_ver1"
        } else {
            "nintendo_wii_ver1"
        };
        Some(id.to_string())
    }
}

pub struct Portalmmm;

impl Handler for Portalmmm {
    fn name(&self) -> &'static str {
        "portalmmm"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with("portalmmm")
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        None
    }
}

pub struct Reksio;

impl Handler for Reksio {
    fn name(&self) -> &'static str {
        "reksio"
    }

    fn can_handle(&self, ua: &UserAgent) -> bool {
        !ua.is_desktop() && ua.starts_with("Reksio")
    }

    fn conclusive(&self, _ctx: &MatchContext<'_>, _ua: &str) -> Option<String> {
        Some("generic_reksio".to_string())
    }
}

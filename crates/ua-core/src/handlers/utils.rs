//! Tolerance helpers and keyword tables shared by the matchers.
//!
//! All positions are byte offsets into the user agent, the unit the prefix
//! matcher counts in.

/// Lowercase substrings that mark a mobile browser.
pub const MOBILE_KEYWORDS: &[&str] = &[
    "midp",
    "mobile",
    "android",
    "samsung",
    "nokia",
    "up.browser",
    "phone",
    "opera mini",
    "opera mobi",
    "brew",
    "sonyericsson",
    "blackberry",
    "netfront",
    "uc browser",
    "symbian",
    "j2me",
    "wap2.",
    "up.link",
    "windows ce",
    "vodafone",
    "ucweb",
    "zte-",
    "ipad;",
    "docomo",
    "armv",
    "maemo",
    "palm",
    "bolt",
    "fennec",
    "wireless",
    "adr-",
    "htc",
    "nintendo",
    // Keeps IE-like phone agents out of the MSIE bucket.
    "zunewp7",
    "skyfire",
    "silk",
    "untrusted",
    "lgtelecom",
    " gt-",
    "ventana",
];

/// Lowercase substrings that mark a smart TV or set-top box.
pub const SMART_TV_KEYWORDS: &[&str] = &[
    "googletv",
    "boxee",
    "sonydtv",
    "appletv",
    "smarttv",
    "dlna",
    "netcast.tv",
];

/// Lowercase substrings that mark a desktop browser.
pub const DESKTOP_KEYWORDS: &[&str] = &[
    "wow64",
    ".net clr",
    "gtb7",
    "macintosh",
    "slcc1",
    "gtb6",
    "funwebproducts",
    "aol 9.",
    "gtb8",
];

/// First `/`, or the length if there is none.
pub fn first_slash(ua: &str) -> usize {
    ua.find('/').unwrap_or(ua.len())
}

/// Second `/`; the first one if there is no second, the length if there
/// is no slash at all.
pub fn second_slash(ua: &str) -> usize {
    match ua.find('/') {
        None => ua.len(),
        Some(first) => ua[first + 1..]
            .find('/')
            .map(|rel| first + 1 + rel)
            .unwrap_or(first),
    }
}

/// First space, or the length if there is none.
pub fn first_space(ua: &str) -> usize {
    ua.find(' ').unwrap_or(ua.len())
}

/// Position of the `ordinal`-th (1-based) occurrence of `needle`.
pub fn ordinal_index_of(ua: &str, needle: char, ordinal: usize) -> Option<usize> {
    if ordinal == 0 {
        return None;
    }
    ua.match_indices(needle).nth(ordinal - 1).map(|(idx, _)| idx)
}

/// Position of `needle` at or after `start`, or the length.
pub fn index_of_or_length(ua: &str, needle: &str, start: usize) -> usize {
    ua.get(start..)
        .and_then(|rest| rest.find(needle))
        .map(|rel| start + rel)
        .unwrap_or(ua.len())
}

/// Earliest position of any of `needles` at or after `start`, or the length.
pub fn index_of_any_or_length(ua: &str, needles: &[&str], start: usize) -> usize {
    needles
        .iter()
        .map(|needle| index_of_or_length(ua, needle, start))
        .min()
        .unwrap_or(ua.len())
}

/// Position just past the end of `needle`, capped at the length.
pub fn end_of(ua: &str, needle: &str) -> Option<usize> {
    ua.find(needle).map(|idx| (idx + needle.len()).min(ua.len()))
}

pub fn contains_any(ua: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| ua.contains(needle))
}

pub fn contains_all(ua: &str, needles: &[&str]) -> bool {
    needles.iter().all(|needle| ua.contains(needle))
}

pub fn starts_with_any(ua: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| ua.starts_with(prefix))
}

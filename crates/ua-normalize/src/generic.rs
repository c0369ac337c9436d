//! Stages applied to every user agent before any family-specific stage.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::RIS_DELIMITER;

static RE_BABEL_FISH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(via babelfish\.yahoo\.com\)\s*").unwrap());

static RE_BLACKBERRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)blackberry").unwrap());

static RE_LOCALE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"; ?[a-z]{2}(?:-[a-zA-Z]{2})?(?:\.utf8|\.big5)?-?(;|\))").unwrap()
});

static RE_NOVARRA_GOOGLE_TRANSLATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\sNovarra-Vision.*)|(,gzip\(gfe\)\s+\(via translate\.google\.com\))").unwrap()
});

static RE_SERIAL_NUMBERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\[(TF|NT|ST)[\d|X]+\])|(/SN[\d|X]+)").unwrap());

static RE_UCWEB_MISSING_OS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^JUC \(Linux; U; (\d)").unwrap());

static RE_YES_WAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*Mozilla/4\.0 \(YesWAP mobile phone proxy\)").unwrap());

/// Drops the Yahoo BabelFish translation proxy marker.
pub fn babel_fish(ua: &str) -> String {
    RE_BABEL_FISH.replace_all(ua, "").into_owned()
}

/// Fixes `BlackBerry` casing and drops anything a proxy put in front of it.
///
/// WebKit-based BlackBerry user agents keep their `Mozilla/5.0` head.
pub fn blackberry(ua: &str) -> String {
    let ua = RE_BLACKBERRY.replace_all(ua, "BlackBerry");
    match ua.find("BlackBerry") {
        Some(index)
            if index > 0 && !ua.contains("AppleWebKit") && !ua.contains(RIS_DELIMITER) =>
        {
            ua[index..].to_string()
        }
        _ => ua.into_owned(),
    }
}

/// Removes locale tags such as `; en-us` or `; it-` up to the next `;` or `)`.
pub fn locale_remover(ua: &str) -> String {
    let mut current = ua.to_string();
    // Adjacent tags share a delimiter, so one pass can leave a new match behind.
    loop {
        let next = RE_LOCALE.replace_all(&current, "$1").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Drops Novarra transcoder and Google translator suffixes.
pub fn novarra_google_translator(ua: &str) -> String {
    RE_NOVARRA_GOOGLE_TRANSLATOR.replace_all(ua, "").into_owned()
}

/// Drops handset serial numbers (`[TF01234]`, `/SN0123X`).
pub fn serial_numbers(ua: &str) -> String {
    RE_SERIAL_NUMBERS.replace_all(ua, "").into_owned()
}

/// Repairs the compressed spacing UCWEB uses in its user agents.
///
/// `JUC(Linux;U;2.3;Desire)` becomes `JUC (Linux; U; 2.3; Desire)` and a
/// missing `Android` platform token is restored.
pub fn ucweb(ua: &str) -> String {
    if !(ua.starts_with("JUC") || ua.starts_with("Mozilla/5.0(Linux;U;Android")) {
        return ua.to_string();
    }
    let spaced = space_after_tokens(ua);
    RE_UCWEB_MISSING_OS
        .replace(&spaced, "JUC (Linux; U; Android $1")
        .into_owned()
}

fn space_after_tokens(ua: &str) -> String {
    let mut out = String::with_capacity(ua.len() + 8);
    let mut rest = ua;
    while let Some(c) = rest.chars().next() {
        let token_len = if rest.starts_with("Android") {
            "Android".len()
        } else if rest.starts_with("JUC") {
            "JUC".len()
        } else if c == ';' || c == ')' {
            1
        } else {
            0
        };

        if token_len == 0 {
            out.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }

        out.push_str(&rest[..token_len]);
        rest = &rest[token_len..];
        if rest
            .chars()
            .next()
            .is_some_and(|n| n.is_alphanumeric() || n == '_' || n == '|' || n == '(')
        {
            out.push(' ');
        }
    }
    out
}

/// Cuts the Openwave `UP.Link` gateway suffix.
pub fn up_link(ua: &str) -> String {
    match ua.find(" UP.Link") {
        Some(index) if index > 0 => ua[..index].to_string(),
        _ => ua.to_string(),
    }
}

/// Drops the YesWAP proxy marker.
pub fn yes_wap(ua: &str) -> String {
    RE_YES_WAP.replace_all(ua, "").into_owned()
}

//! Well-known device identifiers.
//!
//! These ids are referenced by the matching chain as last-resort answers.
//! A definition document is expected to provide them, but the chain only
//! returns one if the repository actually contains it.

/// Root of every fallback chain.
pub const GENERIC: &str = "generic";

/// Catch-all for desktop web browsers.
pub const GENERIC_WEB_BROWSER: &str = "generic_web_browser";

/// Catch-all for XHTML-capable handsets.
pub const GENERIC_XHTML: &str = "generic_xhtml";

/// Catch-all for unidentified mobile browsers.
pub const GENERIC_MOBILE: &str = "generic_mobile";

/// Transcoder-class device used for bots, crawlers and proxies.
pub const GENERIC_WEB_CRAWLER: &str = "generic_web_crawler";

/// Returns true if the id carries no match information.
pub fn is_blank_or_generic(id: &str) -> bool {
    let id = id.trim();
    id.is_empty() || id == GENERIC
}

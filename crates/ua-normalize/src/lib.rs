//! User-agent normalization.
//!
//! Normalization rewrites a raw User-Agent into the form stored in the
//! repository's UA index, so that trivially different strings (locale tags,
//! serial numbers, proxy suffixes, patch-level versions) collapse onto the
//! same key.
//!
//! Every stage is total and every [`Pipeline`] is idempotent: normalizing an
//! already-normalized string returns it unchanged.
//!
//! ```
//! use ua_normalize::{Pipeline, Stage};
//!
//! let android = Pipeline::generic().with_stage(Stage::Android);
//! let once = android.normalize("Mozilla/5.0 (Linux; U; Android 2.2.1; en-us; Nexus One Build/FRG83)");
//! assert_eq!(android.normalize(&once), once);
//! ```

pub mod android;
pub mod generic;
pub mod pipeline;
pub mod specific;
mod text;

pub use pipeline::{Pipeline, Stage};

/// Separates a normalizer-computed prefix from the rest of the user agent.
pub const RIS_DELIMITER: &str = "---";

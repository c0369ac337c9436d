//! String matchers over a sorted index bucket.
//!
//! Both matchers return a position into the bucket's user agents rather than
//! a device id, so callers can resolve the id with [`crate::index::Bucket::id_at`].

pub mod ld;
pub mod ris;

pub use ld::levenshtein_match;
pub use ris::{common_prefix_len, prefix_match};

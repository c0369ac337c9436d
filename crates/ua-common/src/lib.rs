//! Device capability engine common types.
//!
//! This crate provides foundational types shared across the workspace:
//! - The unified error taxonomy with stable codes
//! - Well-known device identifiers used by the matching chain
//! - Output format specifications for the CLI

pub mod error;
pub mod ids;
pub mod output;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use output::OutputFormat;

//! Error types for the device capability engine.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Fallback Cycle
//!   Reason: fallback cycle detected: a -> b -> a
//!   Fix: Break the cycle by pointing one device of the chain at an existing ancestor.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "integrity",
//!   "message": "fallback cycle detected: a -> b -> a",
//!   "recoverable": false,
//!   "suggested_action": "fix_source",
//!   "context": { "chain": ["a", "b", "a"] }
//! }
//! ```
//!
//! Lookup-time misses (unknown user agent) never surface as errors; the
//! matching chain always degrades to the root device.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration and definition-source errors.
    Config,
    /// Repository integrity violations found at build time.
    Integrity,
    /// Lookups by id or capability name that cannot be answered.
    Lookup,
    /// Persistence and cache backend errors.
    Store,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Integrity => write!(f, "integrity"),
            ErrorCategory::Lookup => write!(f, "lookup"),
            ErrorCategory::Store => write!(f, "store"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for automation reacting to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation.
    Retry,
    /// Run validation on the configuration.
    RunCheck,
    /// Fix the device definition document or patch.
    FixSource,
    /// Rebuild the repository from its sources.
    Rebuild,
    /// Clear the persistence or cache store.
    ClearStore,
    /// Skip this item and continue.
    Skip,
    /// Abort the operation.
    Abort,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::FixSource => write!(f, "fix_source"),
            SuggestedAction::Rebuild => write!(f, "rebuild"),
            SuggestedAction::ClearStore => write!(f, "clear_store"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::Abort => write!(f, "abort"),
        }
    }
}

/// Unified error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("definition source not found: {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("malformed definition {}: {message}", path.display())]
    MalformedDefinition { path: PathBuf, message: String },

    #[error("unsupported definition source {}: {message}", path.display())]
    UnsupportedSource { path: PathBuf, message: String },

    // Integrity errors (20-29)
    #[error("fallback cycle detected: {}", chain.join(" -> "))]
    FallbackCycle { chain: Vec<String> },

    #[error("device '{device}' falls back to unknown device '{fallback}'")]
    UnknownFallback { device: String, fallback: String },

    #[error("repository has no root device")]
    MissingRoot,

    #[error("repository has more than one root device: {}", roots.join(", "))]
    MultipleRoots { roots: Vec<String> },

    #[error("device '{id}' is defined more than once in {}", path.display())]
    DuplicateDevice { id: String, path: PathBuf },

    #[error("root device '{root}' does not define capability '{capability}'")]
    RootCapabilityMissing { root: String, capability: String },

    // Lookup errors (30-39)
    #[error("device '{id}' not found")]
    DeviceNotFound { id: String },

    #[error("'{name}' is not a known capability")]
    UndefinedCapability { name: String },

    #[error("'{group}' is not a known capability group")]
    UnknownGroup { group: String },

    // Store errors (40-49)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("stored repository is corrupted: {0}")]
    StoreCorrupted(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Integrity errors
    /// - 30-39: Lookup errors
    /// - 40-49: Store errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::SourceMissing { .. } => 11,
            Error::MalformedDefinition { .. } => 12,
            Error::UnsupportedSource { .. } => 13,
            Error::FallbackCycle { .. } => 20,
            Error::UnknownFallback { .. } => 21,
            Error::MissingRoot => 22,
            Error::MultipleRoots { .. } => 23,
            Error::DuplicateDevice { .. } => 24,
            Error::RootCapabilityMissing { .. } => 25,
            Error::DeviceNotFound { .. } => 30,
            Error::UndefinedCapability { .. } => 31,
            Error::UnknownGroup { .. } => 32,
            Error::StoreUnavailable(_) => 40,
            Error::StoreCorrupted(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::SourceMissing { .. }
            | Error::MalformedDefinition { .. }
            | Error::UnsupportedSource { .. } => ErrorCategory::Config,

            Error::FallbackCycle { .. }
            | Error::UnknownFallback { .. }
            | Error::MissingRoot
            | Error::MultipleRoots { .. }
            | Error::DuplicateDevice { .. }
            | Error::RootCapabilityMissing { .. } => ErrorCategory::Integrity,

            Error::DeviceNotFound { .. }
            | Error::UndefinedCapability { .. }
            | Error::UnknownGroup { .. } => ErrorCategory::Lookup,

            Error::StoreUnavailable(_) | Error::StoreCorrupted(_) => ErrorCategory::Store,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Build-time integrity failures are never recoverable: a partially
    /// built repository would silently misclassify devices.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::SourceMissing { .. } => true,
            Error::MalformedDefinition { .. } => false,
            Error::UnsupportedSource { .. } => false,

            Error::FallbackCycle { .. }
            | Error::UnknownFallback { .. }
            | Error::MissingRoot
            | Error::MultipleRoots { .. }
            | Error::DuplicateDevice { .. }
            | Error::RootCapabilityMissing { .. } => false,

            Error::DeviceNotFound { .. } => false,
            Error::UndefinedCapability { .. } => false,
            Error::UnknownGroup { .. } => false,

            Error::StoreUnavailable(_) => true, // rebuild from sources
            Error::StoreCorrupted(_) => true,   // clear and rebuild

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns the suggested action for automation.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::SourceMissing { .. } => SuggestedAction::RunCheck,
            Error::MalformedDefinition { .. } => SuggestedAction::FixSource,
            Error::UnsupportedSource { .. } => SuggestedAction::FixSource,

            Error::FallbackCycle { .. }
            | Error::UnknownFallback { .. }
            | Error::MissingRoot
            | Error::MultipleRoots { .. }
            | Error::DuplicateDevice { .. }
            | Error::RootCapabilityMissing { .. } => SuggestedAction::FixSource,

            Error::DeviceNotFound { .. } => SuggestedAction::Skip,
            Error::UndefinedCapability { .. } => SuggestedAction::Skip,
            Error::UnknownGroup { .. } => SuggestedAction::Skip,

            Error::StoreUnavailable(_) => SuggestedAction::Rebuild,
            Error::StoreCorrupted(_) => SuggestedAction::ClearStore,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::Abort,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check the configuration file syntax, or point --config at a valid file."
            }
            Error::SourceMissing { .. } => {
                "Verify database.main and database.patches point at existing files."
            }
            Error::MalformedDefinition { .. } => {
                "The definition document is not well-formed XML. Validate it with 'xmllint --noout <file>'."
            }
            Error::UnsupportedSource { .. } => {
                "Use a plain .xml document or a .zip archive whose first entry is the XML document."
            }

            Error::FallbackCycle { .. } => {
                "Break the cycle by pointing one device of the chain at an existing ancestor."
            }
            Error::UnknownFallback { .. } => {
                "Define the fallback device in the base document, or in a patch applied earlier."
            }
            Error::MissingRoot => {
                "Exactly one device must use fall_back=\"root\". Add the generic device to the base document."
            }
            Error::MultipleRoots { .. } => {
                "Only the generic device may use fall_back=\"root\". Give the other roots a real fallback."
            }
            Error::DuplicateDevice { .. } => {
                "Remove the duplicate device element; use a patch document to override capabilities."
            }
            Error::RootCapabilityMissing { .. } => {
                "Every capability must have a default value on the root device. Add it to the generic device."
            }

            Error::DeviceNotFound { .. } => {
                "List known device ids with 'ua-core info', or rebuild after applying the patch that defines it."
            }
            Error::UndefinedCapability { .. } => {
                "Check the capability name, and that it is not excluded by database.capability_filter."
            }
            Error::UnknownGroup { .. } => {
                "List known groups with 'ua-core groups'."
            }

            Error::StoreUnavailable(_) => {
                "Check the persistence directory exists and is writable, or configure database.main so the repository can be rebuilt."
            }
            Error::StoreCorrupted(_) => {
                "Clear the persistence store and run 'ua-core build' again."
            }

            Error::Io(_) => {
                "Check disk space, permissions, and that configured directories exist. Retry the operation."
            }
            Error::Json(_) => {
                "Invalid JSON. Check the file syntax with 'jq . <file>' or restore it from backup."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::SourceMissing { .. } => "Definition Source Missing",
            Error::MalformedDefinition { .. } => "Malformed Definition",
            Error::UnsupportedSource { .. } => "Unsupported Definition Source",

            Error::FallbackCycle { .. } => "Fallback Cycle",
            Error::UnknownFallback { .. } => "Unknown Fallback Device",
            Error::MissingRoot => "Missing Root Device",
            Error::MultipleRoots { .. } => "Multiple Root Devices",
            Error::DuplicateDevice { .. } => "Duplicate Device",
            Error::RootCapabilityMissing { .. } => "Root Capability Missing",

            Error::DeviceNotFound { .. } => "Device Not Found",
            Error::UndefinedCapability { .. } => "Undefined Capability",
            Error::UnknownGroup { .. } => "Unknown Capability Group",

            Error::StoreUnavailable(_) => "Store Unavailable",
            Error::StoreCorrupted(_) => "Store Corrupted",

            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Whether the error is one of the build-time integrity violations.
    pub fn is_integrity(&self) -> bool {
        self.category() == ErrorCategory::Integrity
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for automation.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (device id, capability name, path).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::SourceMissing { path }
            | Error::MalformedDefinition { path, .. }
            | Error::UnsupportedSource { path, .. } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::FallbackCycle { chain } => {
                context.insert("chain".to_string(), serde_json::json!(chain));
            }
            Error::UnknownFallback { device, fallback } => {
                context.insert("device".to_string(), serde_json::json!(device));
                context.insert("fallback".to_string(), serde_json::json!(fallback));
            }
            Error::MultipleRoots { roots } => {
                context.insert("roots".to_string(), serde_json::json!(roots));
            }
            Error::DuplicateDevice { id, path } => {
                context.insert("device".to_string(), serde_json::json!(id));
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::RootCapabilityMissing { root, capability } => {
                context.insert("root".to_string(), serde_json::json!(root));
                context.insert("capability".to_string(), serde_json::json!(capability));
            }
            Error::DeviceNotFound { id } => {
                context.insert("device".to_string(), serde_json::json!(id));
            }
            Error::UndefinedCapability { name } => {
                context.insert("capability".to_string(), serde_json::json!(name));
            }
            Error::UnknownGroup { group } => {
                context.insert("group".to_string(), serde_json::json!(group));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

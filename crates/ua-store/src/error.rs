//! Error types for store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error on an entry or the storage directory
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry header could not be decoded
    #[error("corrupted entry at {}: {message}", path.display())]
    Corrupted { path: PathBuf, message: String },

    /// A directory-backed provider was configured without a directory
    #[error("provider '{provider}' requires a storage directory")]
    MissingDirectory { provider: String },

    /// Provider name not recognized
    #[error("unknown store provider '{0}' (expected file, memory or null)")]
    UnknownProvider(String),

    /// A writer panicked while holding the store lock
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

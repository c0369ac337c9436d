//! TTL-aware key/value stores.
//!
//! One contract serves two purposes: long-lived persistence of the built
//! device repository (`Ttl::Never`) and short-lived memoization of
//! user-agent lookups (`Ttl::After`). Backends differ only in where entries
//! live; expiry is lazy and evaluated on read.
//!
//! Writes replace whole entries, so concurrent writers from independent
//! processes resolve as last-writer-wins.

pub mod clock;
pub mod error;
pub mod file;
pub mod memory;
pub mod null;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use null::NullStore;

/// How long an entry stays retrievable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Retrievable until removed or cleared.
    Never,
    /// Retrievable strictly before `stored_at + duration`.
    After(Duration),
}

impl Ttl {
    /// Builds a TTL from a seconds count where `0` means never expire.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Ttl::Never
        } else {
            Ttl::After(Duration::from_secs(secs))
        }
    }

    /// Absolute expiry for an entry stored at `now`.
    pub fn expires_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Ttl::Never => None,
            Ttl::After(d) => Some(
                chrono::Duration::from_std(d)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            ),
        }
    }
}

/// True if an entry with this expiry must be reported missing at `now`.
pub(crate) fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| now >= at)
}

/// Key/value contract shared by every backend.
pub trait CapabilityStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Stores `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, value: &[u8], ttl: Ttl) -> Result<()>;

    /// Returns the value, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Removes the entry if present.
    fn remove(&self, key: &str) -> Result<()>;

    /// Removes every entry, including ones that never expire.
    fn clear(&self) -> Result<()>;
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// One file per entry under a directory.
    #[default]
    File,
    /// Process-local map.
    Memory,
    /// Stores nothing.
    Null,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::File => "file",
            Provider::Memory => "memory",
            Provider::Null => "null",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" | "filesystem" => Ok(Provider::File),
            "memory" | "mem" => Ok(Provider::Memory),
            "null" | "none" => Ok(Provider::Null),
            other => Err(StoreError::UnknownProvider(other.to_string())),
        }
    }
}

/// Opens the backend named by `provider`.
pub fn open(provider: Provider, dir: Option<&Path>) -> Result<Box<dyn CapabilityStore>> {
    open_with_clock(provider, dir, Arc::new(SystemClock))
}

/// Like [`open`], with an explicit time source.
pub fn open_with_clock(
    provider: Provider,
    dir: Option<&Path>,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn CapabilityStore>> {
    match provider {
        Provider::File => {
            let dir = dir.ok_or_else(|| StoreError::MissingDirectory {
                provider: provider.to_string(),
            })?;
            Ok(Box::new(FileStore::with_clock(dir, clock)?))
        }
        Provider::Memory => Ok(Box::new(MemoryStore::with_clock(clock))),
        Provider::Null => Ok(Box::new(NullStore)),
    }
}

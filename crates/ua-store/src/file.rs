//! Directory-backed store: one file per entry.
//!
//! Each entry file holds a single JSON header line followed by the raw value
//! bytes:
//!
//! ```text
//! {"key":"repository","expires_at":null}\n
//! <value bytes>
//! ```
//!
//! File names are the hex SHA-256 of the key, so arbitrary keys map to safe
//! names. The key is repeated in the header and checked on read. Writes go to
//! a temporary sibling and are renamed into place.
//!
//! An expired entry is re-read before it is unlinked and kept if another
//! writer replaced it in the meantime. A replacement landing between that
//! second read and the unlink is still lost; the next lookup misses and
//! stores it again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{is_expired, CapabilityStore, Clock, Result, StoreError, SystemClock, Ttl};

const ENTRY_EXTENSION: &str = "entry";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Stores entries as files under a directory.
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn new(dir: &Path) -> Result<Self> {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            clock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir
            .join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION))
    }

    fn remove_path(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl FileStore {
    /// Header and value stored under `key`, if the file exists and belongs
    /// to that key.
    fn read_entry(&self, key: &str, path: &Path) -> Result<Option<(EntryHeader, Vec<u8>)>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let (head, value) = split_entry(&bytes).ok_or_else(|| StoreError::Corrupted {
            path: path.to_path_buf(),
            message: "missing entry header".to_string(),
        })?;
        let header: EntryHeader =
            serde_json::from_slice(head).map_err(|e| StoreError::Corrupted {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if header.key != key {
            warn!(
                key,
                stored_key = %header.key,
                path = %path.display(),
                "entry key mismatch"
            );
            return Ok(None);
        }
        Ok(Some((header, value.to_vec())))
    }

    /// Unlinks an expired entry unless it was replaced since it was read.
    fn evict_expired(&self, key: &str, path: &Path) -> Result<Option<Vec<u8>>> {
        match self.read_entry(key, path)? {
            Some((header, value)) if !is_expired(header.expires_at, self.clock.now()) => {
                debug!(key, path = %path.display(), "entry refreshed before eviction");
                Ok(Some(value))
            }
            Some(_) => {
                Self::remove_path(path)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("entry");
    let tmp_path = path.with_file_name(format!(
        "{}.tmp.{}.{}",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
    if let Err(source) = file.write_all(bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(source));
    }
    let _ = file.sync_all();
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        io_err(source)
    })
}

fn split_entry(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let newline = bytes.iter().position(|b| *b == b'\n')?;
    Some((&bytes[..newline], &bytes[newline + 1..]))
}

impl CapabilityStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn put(&self, key: &str, value: &[u8], ttl: Ttl) -> Result<()> {
        let path = self.entry_path(key);
        let header = EntryHeader {
            key: key.to_string(),
            expires_at: ttl.expires_at(self.clock.now()),
        };
        let mut bytes = serde_json::to_vec(&header).map_err(|e| StoreError::Corrupted {
            path: path.clone(),
            message: e.to_string(),
        })?;
        bytes.push(b'\n');
        bytes.extend_from_slice(value);

        write_atomic(&path, &bytes)?;
        debug!(
            key,
            path = %path.display(),
            size = value.len(),
            "stored entry"
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key);
        match self.read_entry(key, &path)? {
            None => Ok(None),
            Some((header, _)) if is_expired(header.expires_at, self.clock.now()) => {
                debug!(key, path = %path.display(), "entry expired");
                self.evict_expired(key, &path)
            }
            Some((_, value)) => Ok(Some(value)),
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::remove_path(&self.entry_path(key))
    }

    fn clear(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0usize;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                Self::remove_path(&path)?;
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "cleared store");
        Ok(())
    }
}

//! Process-local store.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::trace;

use crate::{is_expired, CapabilityStore, Clock, Result, StoreError, SystemClock, Ttl};

/// Entry count at which `put` first sweeps expired entries.
const DEFAULT_PURGE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    /// Size at which the next `put` sweeps expired entries.
    purge_at: usize,
}

impl Entries {
    /// Drops expired entries once the map reaches `purge_at`, then doubles
    /// the mark past what is still live so sweeps stay amortized.
    fn purge_if_due(&mut self, now: DateTime<Utc>, threshold: usize) {
        if self.map.len() < self.purge_at.max(threshold) {
            return;
        }
        let before = self.map.len();
        self.map.retain(|_, entry| !is_expired(entry.expires_at, now));
        self.purge_at = (self.map.len() * 2).max(threshold);
        trace!(removed = before - self.map.len(), live = self.map.len(), "swept expired entries");
    }
}

/// Entries held in a map behind a read/write lock.
///
/// Expired entries are dropped when read, and swept in bulk by `put` once
/// the map grows past a threshold, so never-repeated keys do not pile up.
pub struct MemoryStore {
    entries: RwLock<Entries>,
    clock: Arc<dyn Clock>,
    purge_threshold: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            clock,
            purge_threshold: DEFAULT_PURGE_THRESHOLD,
        }
    }

    /// Sets the entry count at which `put` starts sweeping expired entries.
    pub fn with_purge_threshold(mut self, threshold: usize) -> Self {
        self.purge_threshold = threshold.max(1);
        self
    }

    /// Number of entries held, expired ones included until swept or read.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, key: &str, value: &[u8], ttl: Ttl) -> Result<()> {
        let now = self.clock.now();
        let entry = Entry {
            value: value.to_vec(),
            expires_at: ttl.expires_at(now),
        };
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.purge_if_due(now, self.purge_threshold);
        entries.map.insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
            match entries.map.get(key) {
                None => return Ok(None),
                Some(entry) if !is_expired(entry.expires_at, now) => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => {}
            }
        }
        trace!(key, "memory entry expired");
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        // Another writer may have refreshed the entry between the two locks.
        if entries
            .map
            .get(key)
            .is_some_and(|e| is_expired(e.expires_at, now))
        {
            entries.map.remove(key);
        }
        Ok(None)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.map.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        *entries = Entries::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[test]
    fn put_then_get() {
        let store = MemoryStore::new();
        store.put("k", b"v", Ttl::Never).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn put_replaces_whole_entry() {
        let store = MemoryStore::new();
        store.put("k", b"first", Ttl::Never).unwrap();
        store.put("k", b"2", Ttl::Never).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn expired_entries_are_missing_and_removed() {
        let (store, clock) = store_with_clock();
        store.put("k", b"v", Ttl::from_secs(60)).unwrap();

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn clear_removes_never_expiring_entries() {
        let store = MemoryStore::new();
        store.put("a", b"1", Ttl::Never).unwrap();
        store.put("b", b"2", Ttl::from_secs(3600)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = MemoryStore::new();
        store.put("k", b"v", Ttl::Never).unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn put_sweeps_expired_entries_past_threshold() {
        let (store, clock) = store_with_clock();
        let store = store.with_purge_threshold(8);
        for i in 0..6 {
            store.put(&format!("short-{i}"), b"v", Ttl::from_secs(5)).unwrap();
        }
        store.put("kept", b"v", Ttl::Never).unwrap();
        store.put("later", b"v", Ttl::from_secs(60)).unwrap();
        assert_eq!(store.len(), 8);

        clock.advance(chrono::Duration::seconds(5));
        store.put("fresh", b"v", Ttl::from_secs(60)).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("kept").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("later").unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.get("short-0").unwrap(), None);
    }

    #[test]
    fn distinct_expired_keys_stay_bounded() {
        let (store, clock) = store_with_clock();
        let store = store.with_purge_threshold(16);
        for i in 0..1000 {
            store.put(&format!("ua-{i}"), b"id", Ttl::from_secs(1)).unwrap();
            clock.advance(chrono::Duration::seconds(1));
        }
        assert!(store.len() <= 16, "len = {}", store.len());
    }
}

//! Normalized user-agent index.
//!
//! Each handler owns a bucket of `(normalized user agent, device id)` pairs
//! kept sorted by user agent, which serves both exact lookup (binary search)
//! and the prefix matcher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sorted user agents of one handler with their device ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    uas: Vec<String>,
    ids: Vec<String>,
}

impl Bucket {
    /// Device id indexed under exactly `ua`.
    pub fn exact(&self, ua: &str) -> Option<&str> {
        self.uas
            .binary_search_by(|probe| probe.as_str().cmp(ua))
            .ok()
            .map(|idx| self.ids[idx].as_str())
    }

    /// Sorted user agents.
    pub fn uas(&self) -> &[String] {
        &self.uas
    }

    /// Device id at position `idx` of [`Bucket::uas`].
    pub fn id_at(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uas.is_empty()
    }

    /// Pairs are consistent and strictly sorted.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.uas.len() == self.ids.len() && self.uas.windows(2).all(|w| w[0] < w[1])
    }
}

/// All handler buckets, keyed by bucket name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UaIndex {
    buckets: BTreeMap<String, Bucket>,
}

impl UaIndex {
    pub fn bucket(&self, name: &str) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&str, &Bucket)> {
        self.buckets.iter().map(|(name, b)| (name.as_str(), b))
    }

    /// Total entries across buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.buckets.values().all(Bucket::is_well_formed)
    }
}

/// Accumulates index entries; later entries replace earlier ones for the
/// same bucket and user agent.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    buckets: BTreeMap<String, BTreeMap<String, String>>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry and returns the id it replaced, if any.
    pub fn insert(&mut self, bucket: &str, ua: String, id: String) -> Option<String> {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(ua, id)
    }

    pub fn finish(self) -> UaIndex {
        let buckets = self
            .buckets
            .into_iter()
            .map(|(name, entries)| {
                let (uas, ids) = entries.into_iter().unzip();
                (name, Bucket { uas, ids })
            })
            .collect();
        UaIndex { buckets }
    }
}

//! Repository builder.
//!
//! Turns a base definition plus ordered patches into a validated
//! [`Repository`] with its user-agent index:
//!
//! 1. Parse the base document (XML, or the first entry of a ZIP).
//! 2. Apply each patch in order. A patch entry for a known id overrides
//!    capabilities key by key and any attribute it sets; an entry for a new
//!    id must fall back to a device that already exists.
//! 3. Infer capability types and validate the fallback graph.
//! 4. Index every non-specific device under the buckets the handler chain
//!    would consult for that user agent, in that handler's normal form.
//!
//! The result is wrapped in a [`BuiltRepository`] envelope carrying a
//! fingerprint of the sources, so a persisted build can be reused until a
//! source changes.

pub mod source;
pub mod xml;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ua_common::{Error, Result};
use ua_store::{CapabilityStore, StoreError, Ttl};

use crate::capability::CapabilityType;
use crate::device::Device;
use crate::handlers::Chain;
use crate::index::IndexBuilder;
use crate::logging::event_names;
use crate::repository::{GroupSchema, Repository};
use source::SourceStamp;
use xml::DeviceEntry;

/// Store key of the persisted repository envelope.
pub const REPOSITORY_KEY: &str = "repository";

/// A built repository with the identity of the sources it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltRepository {
    pub fingerprint: String,
    pub built_at: DateTime<Utc>,
    pub repository: Repository,
}

impl BuiltRepository {
    /// Writes the envelope under [`REPOSITORY_KEY`]; it never expires.
    pub fn persist(&self, store: &dyn CapabilityStore) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        store
            .put(REPOSITORY_KEY, &bytes, Ttl::Never)
            .map_err(from_store_error)
    }

    /// Reads the persisted envelope, if any.
    pub fn load(store: &dyn CapabilityStore) -> Result<Option<Self>> {
        let Some(bytes) = store.get(REPOSITORY_KEY).map_err(from_store_error)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::StoreCorrupted(e.to_string()))
    }
}

/// Maps a backend failure onto the engine taxonomy.
pub fn from_store_error(err: StoreError) -> Error {
    match err {
        StoreError::Corrupted { .. } => Error::StoreCorrupted(err.to_string()),
        other => Error::StoreUnavailable(other.to_string()),
    }
}

/// Capability group and name filter applied while parsing.
#[derive(Debug, Clone, Default)]
pub struct CapabilityFilter {
    names: HashSet<String>,
}

impl CapabilityFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Keeps everything when empty, else only listed groups and names.
    pub fn keeps(&self, group: &str, name: &str) -> bool {
        self.is_empty() || self.names.contains(group) || self.names.contains(name)
    }

    /// Sorted names, for fingerprinting.
    fn sorted(&self) -> Vec<String> {
        let mut names: Vec<_> = self.names.iter().cloned().collect();
        names.sort();
        names
    }
}

/// One-shot repository build from definition sources.
#[derive(Debug, Clone)]
pub struct RepositoryBuilder {
    main: PathBuf,
    patches: Vec<PathBuf>,
    filter: CapabilityFilter,
}

impl RepositoryBuilder {
    pub fn new(main: impl Into<PathBuf>) -> Self {
        Self {
            main: main.into(),
            patches: Vec::new(),
            filter: CapabilityFilter::default(),
        }
    }

    /// Appends a patch; patches apply in the order they are added.
    pub fn patch(mut self, path: impl Into<PathBuf>) -> Self {
        self.patches.push(path.into());
        self
    }

    pub fn patches<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.patches.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn capability_filter(mut self, filter: CapabilityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn main(&self) -> &Path {
        &self.main
    }

    /// Fingerprint of the current state of every source and the filter.
    pub fn fingerprint(&self) -> Result<String> {
        let stamps = std::iter::once(&self.main)
            .chain(&self.patches)
            .map(|p| SourceStamp::of(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(source::fingerprint(&stamps, &self.filter.sorted()))
    }

    /// Builds with the standard handler chain.
    pub fn build(&self) -> Result<BuiltRepository> {
        self.build_with(&Chain::standard())
    }

    /// Builds, indexing user agents the way `chain` classifies them.
    pub fn build_with(&self, chain: &Chain) -> Result<BuiltRepository> {
        let fingerprint = self.fingerprint()?;
        info!(
            target: event_names::BUILD_STARTED,
            main = %self.main.display(),
            patches = self.patches.len(),
            "building device repository"
        );

        let keep = |group: &str, name: &str| self.filter.keeps(group, name);
        let base = xml::parse_document(&source::read_document(&self.main)?, &self.main, &keep)?;

        let mut merged = Merged::default();
        for entry in base.devices {
            merged.add_base(entry, &self.main)?;
        }

        for path in &self.patches {
            let patch = xml::parse_document(&source::read_document(path)?, path, &keep)?;
            let count = patch.devices.len();
            for entry in patch.devices {
                merged.apply_patch(entry)?;
            }
            info!(
                target: event_names::BUILD_PATCH_APPLIED,
                path = %path.display(),
                devices = count,
                "patch applied"
            );
        }

        let capability_types = merged.capability_types();
        let info = base.info.unwrap_or_default();
        let repository = Repository::new(info, merged.devices, merged.schema, capability_types)?;
        let repository = index(repository, chain);

        info!(
            target: event_names::BUILD_FINISHED,
            devices = repository.len(),
            indexed = repository.index().len(),
            fingerprint = %fingerprint,
            "device repository built"
        );

        Ok(BuiltRepository {
            fingerprint,
            built_at: Utc::now(),
            repository,
        })
    }
}

/// Devices and schema accumulated across documents.
#[derive(Default)]
struct Merged {
    devices: Vec<Device>,
    by_id: HashMap<String, usize>,
    schema: Vec<GroupSchema>,
    /// Group each capability name was first declared under.
    canonical: HashMap<String, String>,
}

impl Merged {
    fn add_base(&mut self, entry: DeviceEntry, path: &Path) -> Result<()> {
        if self.by_id.contains_key(&entry.id) {
            return Err(Error::DuplicateDevice {
                id: entry.id,
                path: path.to_path_buf(),
            });
        }
        self.insert_new(entry);
        Ok(())
    }

    fn apply_patch(&mut self, entry: DeviceEntry) -> Result<()> {
        let Some(&idx) = self.by_id.get(&entry.id) else {
            if let Some(parent) = entry.parent() {
                if !self.by_id.contains_key(parent) {
                    return Err(Error::UnknownFallback {
                        device: entry.id.clone(),
                        fallback: parent.to_string(),
                    });
                }
            }
            self.insert_new(entry);
            return Ok(());
        };

        let fall_back = entry
            .fall_back
            .as_ref()
            .map(|_| entry.parent().map(str::to_string));
        let capabilities = self.canonicalize(entry.capabilities);
        let device = &mut self.devices[idx];
        if let Some(ua) = entry.user_agent {
            device.user_agent = ua;
        }
        if let Some(fall_back) = fall_back {
            device.fall_back = fall_back;
        }
        if let Some(flag) = entry.actual_device_root {
            device.actual_device_root = flag;
        }
        if let Some(flag) = entry.specific {
            device.specific = flag;
        }
        for (group, name, value) in capabilities {
            device
                .capabilities
                .entry(group)
                .or_default()
                .insert(name, value);
        }
        debug!(device = %device.id, "patched existing device");
        Ok(())
    }

    fn insert_new(&mut self, entry: DeviceEntry) {
        let fall_back = entry.parent().map(str::to_string);
        let capabilities = self.canonicalize(entry.capabilities);
        let mut device = Device {
            id: entry.id,
            user_agent: entry.user_agent.unwrap_or_default(),
            fall_back,
            actual_device_root: entry.actual_device_root.unwrap_or(false),
            specific: entry.specific.unwrap_or(false),
            capabilities: Default::default(),
        };
        for (group, name, value) in capabilities {
            device
                .capabilities
                .entry(group)
                .or_default()
                .insert(name, value);
        }
        self.by_id.insert(device.id.clone(), self.devices.len());
        self.devices.push(device);
    }

    /// Records groups and capability names in first-seen order and files
    /// every capability under the group it was first declared in, so a
    /// later document naming another group still overrides it.
    fn canonicalize(
        &mut self,
        capabilities: Vec<(String, String, String)>,
    ) -> Vec<(String, String, String)> {
        capabilities
            .into_iter()
            .map(|(group, name, value)| {
                if let Some(canonical) = self.canonical.get(&name) {
                    if *canonical != group {
                        debug!(
                            capability = %name,
                            declared = %group,
                            canonical = %canonical,
                            "capability filed under its first group"
                        );
                    }
                    return (canonical.clone(), name, value);
                }
                self.canonical.insert(name.clone(), group.clone());
                match self.schema.iter_mut().find(|g| g.id == group) {
                    Some(schema) => schema.capabilities.push(name.clone()),
                    None => self.schema.push(GroupSchema {
                        id: group.clone(),
                        capabilities: vec![name.clone()],
                    }),
                }
                (group, name, value)
            })
            .collect()
    }

    fn capability_types(&self) -> BTreeMap<String, CapabilityType> {
        let mut types: BTreeMap<String, CapabilityType> = BTreeMap::new();
        for device in &self.devices {
            for caps in device.capabilities.values() {
                for (name, value) in caps {
                    types
                        .entry(name.clone())
                        .and_modify(|t| *t = t.observe(value))
                        .or_insert_with(|| CapabilityType::of(value));
                }
            }
        }
        types
    }
}

/// Attaches the user-agent index. Specific devices and devices without a
/// user agent are reachable by id only.
fn index(repository: Repository, chain: &Chain) -> Repository {
    let mut builder = IndexBuilder::new();
    for device in repository.devices() {
        if device.specific || device.user_agent.trim().is_empty() {
            continue;
        }
        let Some((buckets, normalized)) = chain.index_keys(&device.user_agent) else {
            continue;
        };
        for bucket in buckets {
            if let Some(previous) =
                builder.insert(bucket, normalized.clone(), device.id.clone())
            {
                debug!(
                    bucket,
                    replaced = %previous,
                    by = %device.id,
                    "normalized user agent indexed twice"
                );
            }
        }
    }
    repository.with_index(builder.finish())
}

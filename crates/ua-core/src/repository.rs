//! Device repository and capability resolution.
//!
//! Devices live in an arena; fallbacks are stored as arena indices, so
//! integrity checks (single root, known fallbacks, no cycles) are plain
//! graph walks. A built repository is read-only and can be shared across
//! threads without locking.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use ua_common::{Error, Result};

use crate::capability::{CapabilityType, CapabilityValue};
use crate::device::Device;
use crate::index::UaIndex;

/// Version metadata of the definition document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub version: String,
    pub last_updated: String,
}

/// Capability names of one group, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchema {
    pub id: String,
    pub capabilities: Vec<String>,
}

/// Serialized form; lookup tables are rebuilt on load.
#[derive(Deserialize)]
struct RepositoryData {
    info: DatabaseInfo,
    devices: Vec<Device>,
    groups: Vec<GroupSchema>,
    capability_types: BTreeMap<String, CapabilityType>,
    index: UaIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RepositoryData")]
pub struct Repository {
    info: DatabaseInfo,
    devices: Vec<Device>,
    groups: Vec<GroupSchema>,
    capability_types: BTreeMap<String, CapabilityType>,
    index: UaIndex,

    #[serde(skip)]
    by_id: HashMap<String, usize>,
    #[serde(skip)]
    fallbacks: Vec<Option<usize>>,
    #[serde(skip)]
    root: usize,
    /// Capability name to the group that declares it.
    #[serde(skip)]
    capability_group: HashMap<String, String>,
}

impl TryFrom<RepositoryData> for Repository {
    type Error = String;

    fn try_from(data: RepositoryData) -> std::result::Result<Self, Self::Error> {
        if !data.index.is_well_formed() {
            return Err("user-agent index is not sorted".to_string());
        }
        let repo = Repository::new(data.info, data.devices, data.groups, data.capability_types)
            .map_err(|e| e.to_string())?;
        Ok(repo.with_index(data.index))
    }
}

impl Repository {
    /// Assembles a repository and checks its integrity.
    ///
    /// Fails if ids repeat, a fallback is unknown, there is not exactly one
    /// root, the fallback graph has a cycle, or the root leaves a declared
    /// capability undefined.
    pub fn new(
        info: DatabaseInfo,
        devices: Vec<Device>,
        groups: Vec<GroupSchema>,
        capability_types: BTreeMap<String, CapabilityType>,
    ) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(devices.len());
        for (idx, device) in devices.iter().enumerate() {
            if by_id.insert(device.id.clone(), idx).is_some() {
                return Err(Error::DuplicateDevice {
                    id: device.id.clone(),
                    path: PathBuf::from("<repository>"),
                });
            }
        }

        let mut fallbacks = Vec::with_capacity(devices.len());
        let mut roots = Vec::new();
        for (idx, device) in devices.iter().enumerate() {
            match &device.fall_back {
                None => {
                    roots.push(idx);
                    fallbacks.push(None);
                }
                Some(parent) => match by_id.get(parent) {
                    Some(&p) => fallbacks.push(Some(p)),
                    None => {
                        return Err(Error::UnknownFallback {
                            device: device.id.clone(),
                            fallback: parent.clone(),
                        })
                    }
                },
            }
        }

        let root = match roots.as_slice() {
            [] => return Err(Error::MissingRoot),
            [root] => *root,
            many => {
                return Err(Error::MultipleRoots {
                    roots: many.iter().map(|&i| devices[i].id.clone()).collect(),
                })
            }
        };

        if let Some(cycle) = find_cycle(&fallbacks) {
            return Err(Error::FallbackCycle {
                chain: cycle.into_iter().map(|i| devices[i].id.clone()).collect(),
            });
        }

        let mut capability_group = HashMap::new();
        for group in &groups {
            for name in &group.capabilities {
                capability_group
                    .entry(name.clone())
                    .or_insert_with(|| group.id.clone());
            }
        }

        let root_device = &devices[root];
        for (name, group) in &capability_group {
            if root_device.own_capability(group, name).is_none() {
                return Err(Error::RootCapabilityMissing {
                    root: root_device.id.clone(),
                    capability: name.clone(),
                });
            }
        }

        Ok(Self {
            info,
            devices,
            groups,
            capability_types,
            index: UaIndex::default(),
            by_id,
            fallbacks,
            root,
            capability_group,
        })
    }

    pub(crate) fn with_index(mut self, index: UaIndex) -> Self {
        self.index = index;
        self
    }

    pub fn info(&self) -> &DatabaseInfo {
        &self.info
    }

    pub fn index(&self) -> &UaIndex {
        &self.index
    }

    pub fn root(&self) -> &Device {
        &self.devices[self.root]
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn get_device(&self, id: &str) -> Result<&Device> {
        self.by_id
            .get(id)
            .map(|&idx| &self.devices[idx])
            .ok_or_else(|| Error::DeviceNotFound { id: id.to_string() })
    }

    /// Every device id, sorted.
    pub fn all_device_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.devices.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Group names in document order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.id.as_str())
    }

    pub fn capability_names_for_group(&self, group: &str) -> Result<&[String]> {
        self.groups
            .iter()
            .find(|g| g.id == group)
            .map(|g| g.capabilities.as_slice())
            .ok_or_else(|| Error::UnknownGroup {
                group: group.to_string(),
            })
    }

    pub fn is_capability(&self, name: &str) -> bool {
        self.capability_group.contains_key(name)
    }

    pub fn capability_type(&self, name: &str) -> Option<CapabilityType> {
        self.capability_types.get(name).copied()
    }

    /// Devices from `id` up to and including the root.
    pub fn fallback_chain(&self, id: &str) -> Result<Vec<&Device>> {
        let mut idx = *self
            .by_id
            .get(id)
            .ok_or_else(|| Error::DeviceNotFound { id: id.to_string() })?;
        let mut chain = vec![&self.devices[idx]];
        while let Some(parent) = self.fallbacks[idx] {
            chain.push(&self.devices[parent]);
            idx = parent;
        }
        Ok(chain)
    }

    /// Value of `name` for device `id`, inherited from the nearest ancestor
    /// that defines it.
    pub fn capability(&self, id: &str, name: &str) -> Result<&str> {
        let group = self
            .capability_group
            .get(name)
            .ok_or_else(|| Error::UndefinedCapability {
                name: name.to_string(),
            })?;
        for device in self.fallback_chain(id)? {
            if let Some(value) = device.own_capability(group, name) {
                return Ok(value);
            }
        }
        Err(Error::RootCapabilityMissing {
            root: self.root().id.clone(),
            capability: name.to_string(),
        })
    }

    /// Like [`Repository::capability`], converted to the inferred type.
    pub fn typed_capability(&self, id: &str, name: &str) -> Result<CapabilityValue> {
        let raw = self.capability(id, name)?;
        let kind = self
            .capability_type(name)
            .unwrap_or(CapabilityType::String);
        Ok(kind.convert(raw))
    }

    /// Every capability of device `id` with inheritance applied.
    pub fn all_capabilities(&self, id: &str) -> Result<BTreeMap<&str, &str>> {
        let mut merged = BTreeMap::new();
        // Walk root first so nearer devices overwrite.
        for device in self.fallback_chain(id)?.into_iter().rev() {
            for caps in device.capabilities.values() {
                for (name, value) in caps {
                    merged.insert(name.as_str(), value.as_str());
                }
            }
        }
        Ok(merged)
    }
}

/// Returns the devices of a fallback cycle, with the first repeated at the
/// end, or `None` if the graph is a forest.
fn find_cycle(fallbacks: &[Option<usize>]) -> Option<Vec<usize>> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; fallbacks.len()];
    for start in 0..fallbacks.len() {
        if state[start] != UNSEEN {
            continue;
        }
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(node) = current {
            match state[node] {
                UNSEEN => {
                    state[node] = ON_PATH;
                    path.push(node);
                    current = fallbacks[node];
                }
                ON_PATH => {
                    let from = path.iter().position(|&n| n == node).unwrap_or(0);
                    let mut cycle = path[from..].to_vec();
                    cycle.push(node);
                    return Some(cycle);
                }
                _ => break,
            }
        }
        for node in path {
            state[node] = DONE;
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::GroupedCapabilities;

    fn device(id: &str, fall_back: Option<&str>, caps: &[(&str, &str, &str)]) -> Device {
        let mut grouped = GroupedCapabilities::new();
        for (group, name, value) in caps {
            grouped
                .entry(group.to_string())
                .or_default()
                .insert(name.to_string(), value.to_string());
        }
        Device {
            id: id.to_string(),
            user_agent: String::new(),
            fall_back: fall_back.map(str::to_string),
            actual_device_root: false,
            specific: false,
            capabilities: grouped,
        }
    }

    fn schema() -> Vec<GroupSchema> {
        vec![
            GroupSchema {
                id: "product_info".to_string(),
                capabilities: vec!["brand_name".to_string()],
            },
            GroupSchema {
                id: "display".to_string(),
                capabilities: vec![
                    "resolution_width".to_string(),
                    "resolution_height".to_string(),
                ],
            },
        ]
    }

    fn sample() -> Repository {
        Repository::new(
            DatabaseInfo::default(),
            vec![
                device(
                    "generic",
                    None,
                    &[
                        ("product_info", "brand_name", ""),
                        ("display", "resolution_width", "90"),
                        ("display", "resolution_height", "40"),
                    ],
                ),
                device(
                    "ericsson_generic",
                    Some("generic"),
                    &[("display", "resolution_width", "101")],
                ),
                device(
                    "ericsson_t20_ver1",
                    Some("ericsson_generic"),
                    &[
                        ("product_info", "brand_name", "Ericsson"),
                        ("display", "resolution_height", "33"),
                    ],
                ),
            ],
            schema(),
            BTreeMap::from([
                ("resolution_width".to_string(), CapabilityType::Int),
                ("resolution_height".to_string(), CapabilityType::Int),
                ("brand_name".to_string(), CapabilityType::String),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn capability_is_inherited_from_nearest_ancestor() {
        let repo = sample();
        assert_eq!(repo.capability("ericsson_t20_ver1", "resolution_width").unwrap(), "101");
        assert_eq!(repo.capability("ericsson_t20_ver1", "resolution_height").unwrap(), "33");
        assert_eq!(repo.capability("ericsson_generic", "resolution_height").unwrap(), "40");
        assert_eq!(
            repo.typed_capability("ericsson_t20_ver1", "resolution_width").unwrap(),
            CapabilityValue::Int(101)
        );
    }

    #[test]
    fn unknown_capability_and_device_are_distinct_errors() {
        let repo = sample();
        assert!(matches!(
            repo.capability("ericsson_t20_ver1", "no_such_thing"),
            Err(Error::UndefinedCapability { .. })
        ));
        assert!(matches!(
            repo.capability("nope", "resolution_width"),
            Err(Error::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn fallback_chain_ends_at_root() {
        let repo = sample();
        let ids: Vec<&str> = repo
            .fallback_chain("ericsson_t20_ver1")
            .unwrap()
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, ["ericsson_t20_ver1", "ericsson_generic", "generic"]);
        assert_eq!(repo.root().id, "generic");
    }

    #[test]
    fn all_capabilities_merges_chain() {
        let repo = sample();
        let caps = repo.all_capabilities("ericsson_t20_ver1").unwrap();
        assert_eq!(caps["brand_name"], "Ericsson");
        assert_eq!(caps["resolution_width"], "101");
        assert_eq!(caps.len(), 3);
    }

    #[test]
    fn group_listing() {
        let repo = sample();
        assert_eq!(repo.groups().collect::<Vec<_>>(), ["product_info", "display"]);
        assert_eq!(
            repo.capability_names_for_group("display").unwrap(),
            ["resolution_width", "resolution_height"]
        );
        assert!(matches!(
            repo.capability_names_for_group("wml_ui"),
            Err(Error::UnknownGroup { .. })
        ));
    }

    #[test]
    fn cycle_is_rejected() {
        let err = Repository::new(
            DatabaseInfo::default(),
            vec![
                device("generic", None, &[]),
                device("a", Some("b"), &[]),
                device("b", Some("c"), &[]),
                device("c", Some("a"), &[]),
            ],
            Vec::new(),
            BTreeMap::new(),
        )
        .unwrap_err();
        match err {
            Error::FallbackCycle { chain } => {
                assert_eq!(chain, ["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn root_count_is_checked() {
        let none = Repository::new(
            DatabaseInfo::default(),
            vec![device("a", Some("b"), &[]), device("b", Some("a"), &[])],
            Vec::new(),
            BTreeMap::new(),
        );
        assert!(matches!(none, Err(Error::MissingRoot)));

        let two = Repository::new(
            DatabaseInfo::default(),
            vec![device("generic", None, &[]), device("other", None, &[])],
            Vec::new(),
            BTreeMap::new(),
        );
        assert!(matches!(two, Err(Error::MultipleRoots { .. })));
    }

    #[test]
    fn unknown_fallback_is_rejected() {
        let err = Repository::new(
            DatabaseInfo::default(),
            vec![device("generic", None, &[]), device("x", Some("missing"), &[])],
            Vec::new(),
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownFallback { ref fallback, .. } if fallback == "missing"));
    }

    #[test]
    fn root_must_define_every_capability() {
        let err = Repository::new(
            DatabaseInfo::default(),
            vec![
                device("generic", None, &[("display", "resolution_width", "90")]),
                device("x", Some("generic"), &[("display", "resolution_height", "1")]),
            ],
            vec![GroupSchema {
                id: "display".to_string(),
                capabilities: vec![
                    "resolution_width".to_string(),
                    "resolution_height".to_string(),
                ],
            }],
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::RootCapabilityMissing { ref capability, .. } if capability == "resolution_height"));
    }

    #[test]
    fn serde_round_trip_rebuilds_lookups() {
        let repo = sample();
        let json = serde_json::to_string(&repo).unwrap();
        let back: Repository = serde_json::from_str(&json).unwrap();
        assert_eq!(back.capability("ericsson_t20_ver1", "resolution_width").unwrap(), "101");
        assert_eq!(back.root().id, "generic");
    }

    #[test]
    fn corrupted_payload_fails_to_load() {
        let repo = sample();
        let mut value = serde_json::to_value(&repo).unwrap();
        value["devices"][1]["fall_back"] = serde_json::json!("ghost");
        assert!(serde_json::from_value::<Repository>(value).is_err());
    }
}

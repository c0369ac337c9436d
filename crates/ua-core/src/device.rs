//! Device records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capabilities set at one node, keyed by group then capability name.
pub type GroupedCapabilities = BTreeMap<String, BTreeMap<String, String>>;

/// A named profile of capability values.
///
/// Only capabilities overridden at this node are stored; everything else is
/// inherited through the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,

    /// Pattern the device is matched against; empty for synthetic devices.
    pub user_agent: String,

    /// Parent device, `None` only for the root.
    pub fall_back: Option<String>,

    /// True for the first device of a real handset family.
    #[serde(default)]
    pub actual_device_root: bool,

    /// Reachable by id only, never returned by user-agent matching.
    #[serde(default)]
    pub specific: bool,

    #[serde(default)]
    pub capabilities: GroupedCapabilities,
}

impl Device {
    pub fn is_root(&self) -> bool {
        self.fall_back.is_none()
    }

    /// Value set at this node, if any.
    pub fn own_capability(&self, group: &str, name: &str) -> Option<&str> {
        self.capabilities
            .get(group)
            .and_then(|caps| caps.get(name))
            .map(String::as_str)
    }

    /// Number of capabilities overridden at this node.
    pub fn own_capability_count(&self) -> usize {
        self.capabilities.values().map(BTreeMap::len).sum()
    }
}

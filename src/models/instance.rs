use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Metadata key an instance uses to opt into cleanup. Value is the TTL in minutes, base 10.
pub const TTL_METADATA_KEY: &str = "ttl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub zone: String,
    /// RFC 3339, as reported by the inventory. Parsed only when a TTL is declared.
    pub creation_timestamp: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Instance {
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        creation_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            zone: zone.into(),
            creation_timestamp: creation_timestamp.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn ttl_value(&self) -> Option<&str> {
        self.metadata.get(TTL_METADATA_KEY).map(String::as_str)
    }
}

/// Instances of a project grouped by zone name. Zones iterate in name order.
pub type Inventory = BTreeMap<String, Vec<Instance>>;

/// `projects/p/zones/us-central1-a` and `zones/us-central1-a` both become `us-central1-a`.
pub fn zone_name(zone: &str) -> &str {
    let trimmed = zone.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Identifies one instance scheduled for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRef {
    pub zone: String,
    pub name: String,
}

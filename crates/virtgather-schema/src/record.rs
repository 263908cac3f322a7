//! Normalized host record types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel for string fields a platform does not report
pub const UNKNOWN: &str = "unknown";

/// Merged inventory result: host key to host data
///
/// Values are plain JSON so that replayed documents (File module) pass
/// through unchanged while the other modules insert serialized
/// [`HostRecord`]s. The BTree ordering gives deterministic output.
pub type HostMap = BTreeMap<String, Value>;

/// Normalized description of one hypervisor or cloud host and its guests
///
/// Every field is always serialized so downstream consumers can rely on key
/// presence; unreported values fall back to zero, empty, or `"unknown"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostRecord {
    /// Host name as reported by the platform
    pub name: String,
    /// Stable unique identifier for the host
    pub host_identifier: String,
    /// Identifier to use when the platform has no stable one
    pub fallback_host_identifier: String,
    /// Platform tag (proxmox, kubernetes, ...)
    #[serde(rename = "type")]
    pub platform_type: String,
    /// Host operating system / hypervisor product
    pub os: String,
    pub os_version: String,
    pub total_cpu_sockets: u64,
    pub total_cpu_cores: u64,
    pub total_cpu_threads: u64,
    pub cpu_mhz: f64,
    pub cpu_vendor: String,
    pub cpu_description: String,
    pub cpu_arch: String,
    pub ram_mb: u64,
    /// Guest name to guest identifier
    ///
    /// Guest names are not globally unique; identity is the pair
    /// (host key, guest identifier).
    pub vms: BTreeMap<String, Value>,
    /// Guest name to free-form per-guest attributes (power state etc.)
    pub optional_vm_data: BTreeMap<String, Value>,
}

impl Default for HostRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            host_identifier: String::new(),
            fallback_host_identifier: String::new(),
            platform_type: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            os_version: UNKNOWN.to_string(),
            total_cpu_sockets: 0,
            total_cpu_cores: 0,
            total_cpu_threads: 0,
            cpu_mhz: 0.0,
            cpu_vendor: UNKNOWN.to_string(),
            cpu_description: UNKNOWN.to_string(),
            cpu_arch: UNKNOWN.to_string(),
            ram_mb: 0,
            vms: BTreeMap::new(),
            optional_vm_data: BTreeMap::new(),
        }
    }
}

impl HostRecord {
    /// Create a record for `name`, using the name as identifier until the
    /// module fills in a stable one
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            host_identifier: name.clone(),
            fallback_host_identifier: name.clone(),
            name,
            ..Self::default()
        }
    }

    /// Register a guest, keeping `vms` and `optional_vm_data` key sets 1:1
    pub fn insert_vm(&mut self, name: impl Into<String>, id: Value, data: Value) {
        let name = name.into();
        self.vms.insert(name.clone(), id);
        self.optional_vm_data.insert(name, data);
    }
}

//! Nutanix AHV module
//!
//! Queries the Prism REST API v2 (`/PrismGateway/services/rest/v2.0`) for
//! hypervisor hosts and assigns VMs to them by `host_uuid`. Prism ships a
//! self-signed certificate by default, so verification is skipped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, info, warn};

use virtgather_core::{Collector, ConfigError, ParamDefault, ParamSpec, validate_parameters};
use virtgather_schema::{HostMap, HostRecord, TargetRecord, UNKNOWN};

use crate::error::CollectError;

const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("hostname", ParamDefault::Empty),
    ParamSpec::new("port", ParamDefault::Int(443)),
    ParamSpec::new("username", ParamDefault::Empty),
    ParamSpec::new("password", ParamDefault::Empty),
];

/// Nutanix AHV collector
pub struct NutanixCollector {
    hostname: String,
    port: u16,
    username: String,
    password: String,
    timeout: Duration,
}

// Prism v2 response types

#[derive(Deserialize, Default)]
struct EntityList<T> {
    #[serde(default)]
    entities: Vec<T>,
}

#[derive(Deserialize, Default)]
struct HostEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uuid: String,
    #[serde(default)]
    serial: Option<String>,
    #[serde(default)]
    num_cpu_sockets: u64,
    #[serde(default)]
    num_cpu_cores: u64,
    #[serde(default)]
    num_cpu_threads: u64,
    #[serde(default)]
    cpu_frequency_in_hz: u64,
    #[serde(default)]
    cpu_model: Option<String>,
    #[serde(default)]
    memory_capacity_in_bytes: u64,
    #[serde(default)]
    hypervisor_full_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct VmEntity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uuid: String,
    #[serde(default)]
    host_uuid: Option<String>,
    #[serde(default)]
    power_state: Option<String>,
}

impl NutanixCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hostname: String::new(),
            port: 443,
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(60),
        }
    }

    async fn get<T: DeserializeOwned>(&self, client: &Client, path: &str) -> Result<T, CollectError> {
        let url = format!(
            "https://{}:{}/PrismGateway/services/rest/v2.0/{path}",
            self.hostname, self.port
        );
        Ok(client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn collect(&self) -> Result<HostMap, CollectError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        let hosts: EntityList<HostEntity> = self.get(&client, "hosts/").await?;
        let vms: EntityList<VmEntity> = self.get(&client, "vms/").await?;

        if hosts.entities.is_empty() {
            warn!(hostname = %self.hostname, "no hosts reported by Prism");
        }

        let mut output = HostMap::new();
        for entity in &hosts.entities {
            let record = host_record(entity, &vms.entities);
            output.insert(entity.name.clone(), serde_json::to_value(record)?);
        }
        Ok(output)
    }
}

impl Default for NutanixCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the normalized record for one AHV host
fn host_record(entity: &HostEntity, vms: &[VmEntity]) -> HostRecord {
    let mut record = HostRecord::new(&entity.name);
    if !entity.uuid.is_empty() {
        record.host_identifier = entity.uuid.clone();
    }
    if let Some(serial) = &entity.serial
        && !serial.is_empty()
    {
        record.fallback_host_identifier = serial.clone();
    }
    record.platform_type = "nutanix".to_string();
    record.os = "Nutanix AHV".to_string();
    record.os_version = entity
        .hypervisor_full_name
        .clone()
        .unwrap_or_else(|| UNKNOWN.to_string());
    record.total_cpu_sockets = entity.num_cpu_sockets;
    record.total_cpu_cores = entity.num_cpu_cores;
    record.total_cpu_threads = entity.num_cpu_threads;
    record.cpu_mhz = entity.cpu_frequency_in_hz as f64 / 1_000_000.0;
    record.cpu_description = entity.cpu_model.clone().unwrap_or_else(|| UNKNOWN.to_string());
    record.cpu_arch = "x86_64".to_string();
    record.ram_mb = entity.memory_capacity_in_bytes / (1024 * 1024);

    for vm in vms
        .iter()
        .filter(|vm| vm.host_uuid.as_deref() == Some(entity.uuid.as_str()))
    {
        record.insert_vm(
            vm.name.clone(),
            json!(vm.uuid),
            json!({"vmState": power_state(vm.power_state.as_deref())}),
        );
    }
    record
}

fn power_state(raw: Option<&str>) -> &'static str {
    match raw {
        Some("on") => "running",
        Some("off") => "stopped",
        Some("paused") => "paused",
        Some("suspended") => "suspended",
        _ => UNKNOWN,
    }
}

#[async_trait]
impl Collector for NutanixCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMETERS
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(PARAMETERS, node)?;

        let port = node.get_u64("port").ok_or_else(|| ConfigError::InvalidParameter {
            name: "port".to_string(),
            reason: "expected a number".to_string(),
        })?;
        self.port = u16::try_from(port).map_err(|_| ConfigError::InvalidParameter {
            name: "port".to_string(),
            reason: "port out of range".to_string(),
        })?;

        self.hostname = node.get_str("hostname").unwrap_or_default().to_string();
        self.username = node.get_str("username").unwrap_or_default().to_string();
        self.password = node.get_str("password").unwrap_or_default().to_string();
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        info!(hostname = %self.hostname, port = self.port, "querying Prism API");
        match self.collect().await {
            Ok(hosts) => Some(hosts),
            Err(e) => {
                error!(hostname = %self.hostname, error = %e, "Nutanix collection failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn target(value: Value) -> TargetRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_set_node_requires_all_parameters() {
        let mut collector = NutanixCollector::new();
        let err = collector
            .set_node(&target(json!({
                "hostname": "prism.example.com",
                "port": 9440
            })))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(name) if name == "username"));
    }

    #[test]
    fn test_set_node_accepts_string_port() {
        let mut collector = NutanixCollector::new();
        collector
            .set_node(&target(json!({
                "hostname": "prism.example.com",
                "port": "9440",
                "username": "admin",
                "password": "secret"
            })))
            .unwrap();
        assert_eq!(collector.port, 9440);
    }

    #[test]
    fn test_set_node_rejects_out_of_range_port() {
        let mut collector = NutanixCollector::new();
        let err = collector
            .set_node(&target(json!({
                "hostname": "prism.example.com",
                "port": 70000,
                "username": "admin",
                "password": "secret"
            })))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { name, .. } if name == "port"));
    }

    #[test]
    fn test_host_record_assigns_vms_by_host_uuid() {
        let host: HostEntity = serde_json::from_value(json!({
            "name": "ahv-1",
            "uuid": "host-uuid-1",
            "serial": "SN123",
            "num_cpu_sockets": 2,
            "num_cpu_cores": 24,
            "num_cpu_threads": 48,
            "cpu_frequency_in_hz": 2_600_000_000u64,
            "cpu_model": "Intel Xeon Gold 6240",
            "memory_capacity_in_bytes": 412316860416u64,
            "hypervisor_full_name": "Nutanix 20230302.101"
        }))
        .unwrap();
        let vms: Vec<VmEntity> = serde_json::from_value(json!([
            {"name": "db-1", "uuid": "vm-1", "host_uuid": "host-uuid-1", "power_state": "on"},
            {"name": "db-2", "uuid": "vm-2", "host_uuid": "host-uuid-2", "power_state": "on"},
            {"name": "old", "uuid": "vm-3", "host_uuid": "host-uuid-1", "power_state": "off"}
        ]))
        .unwrap();

        let record = host_record(&host, &vms);

        assert_eq!(record.host_identifier, "host-uuid-1");
        assert_eq!(record.fallback_host_identifier, "SN123");
        assert_eq!(record.os_version, "Nutanix 20230302.101");
        assert_eq!(record.cpu_mhz, 2600.0);
        assert_eq!(record.ram_mb, 393216);

        assert_eq!(record.vms.len(), 2);
        assert_eq!(record.vms["db-1"], json!("vm-1"));
        assert!(!record.vms.contains_key("db-2"));
        assert_eq!(record.optional_vm_data["db-1"]["vmState"], "running");
        assert_eq!(record.optional_vm_data["old"]["vmState"], "stopped");
    }

    #[test]
    fn test_power_state_mapping() {
        assert_eq!(power_state(Some("on")), "running");
        assert_eq!(power_state(Some("off")), "stopped");
        assert_eq!(power_state(Some("weird")), UNKNOWN);
        assert_eq!(power_state(None), UNKNOWN);
    }
}

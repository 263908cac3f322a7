//! Kubernetes module
//!
//! Lists cluster nodes and the pods scheduled on them via the API server
//! REST endpoints. Pods play the role of guests: keyed `namespace/name`,
//! identified by their UID, with the pod phase as `vmState`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Identity};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{error, info, warn};

use virtgather_core::{Collector, ConfigError, ParamDefault, ParamSpec};
use virtgather_schema::{HostMap, HostRecord, TargetRecord, UNKNOWN};

use crate::error::CollectError;

const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("url", ParamDefault::Empty),
    ParamSpec::new("username", ParamDefault::Empty),
    ParamSpec::new("password", ParamDefault::Empty),
    ParamSpec::new("client-cert", ParamDefault::Empty),
    ParamSpec::new("client-key", ParamDefault::Empty),
    ParamSpec::new("ca-cert", ParamDefault::Empty),
];

/// Kubernetes collector
pub struct KubernetesCollector {
    url: String,
    username: String,
    password: String,
    client_cert: String,
    client_key: String,
    ca_cert: String,
    timeout: Duration,
}

// API server response types

#[derive(Deserialize, Default)]
struct ObjectList<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uid: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Deserialize, Default)]
struct NodeItem {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    status: NodeStatus,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NodeStatus {
    #[serde(default)]
    node_info: NodeInfo,
    #[serde(default)]
    capacity: Capacity,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NodeInfo {
    #[serde(default)]
    os_image: String,
    #[serde(default)]
    kubelet_version: String,
    #[serde(default)]
    architecture: String,
    #[serde(default, rename = "machineID")]
    machine_id: String,
}

#[derive(Deserialize, Default)]
struct Capacity {
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    memory: String,
}

#[derive(Deserialize, Default)]
struct PodItem {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    spec: PodSpec,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: String,
}

#[derive(Deserialize, Default)]
struct PodStatus {
    #[serde(default)]
    phase: String,
}

impl KubernetesCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            client_cert: String::new(),
            client_key: String::new(),
            ca_cert: String::new(),
            timeout: Duration::from_secs(60),
        }
    }

    async fn client(&self) -> Result<Client, CollectError> {
        let mut builder = Client::builder().timeout(self.timeout);

        if self.ca_cert.is_empty() {
            // API servers commonly present a cluster-local CA; without one
            // configured the certificate cannot be verified.
            warn!("no ca-cert configured, skipping server certificate verification");
            builder = builder.danger_accept_invalid_certs(true);
        } else {
            let pem = tokio::fs::read(&self.ca_cert).await?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        if !self.client_cert.is_empty() {
            let mut pem = tokio::fs::read(&self.client_cert).await?;
            pem.extend(tokio::fs::read(&self.client_key).await?);
            builder = builder.identity(Identity::from_pem(&pem)?);
        }

        Ok(builder.build()?)
    }

    async fn get<T: DeserializeOwned>(&self, client: &Client, path: &str) -> Result<T, CollectError> {
        let url = format!("{}/{path}", self.url.trim_end_matches('/'));
        let mut request = client.get(&url);
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }
        Ok(request.send().await?.error_for_status()?.json().await?)
    }

    async fn collect(&self) -> Result<HostMap, CollectError> {
        let client = self.client().await?;
        let nodes: ObjectList<NodeItem> = self.get(&client, "api/v1/nodes").await?;
        let pods: ObjectList<PodItem> = self.get(&client, "api/v1/pods").await?;

        let mut output = HostMap::new();
        for node in &nodes.items {
            let mut record = node_record(node);
            for pod in pods
                .items
                .iter()
                .filter(|pod| pod.spec.node_name == node.metadata.name)
            {
                let key = format!("{}/{}", pod.metadata.namespace, pod.metadata.name);
                record.insert_vm(
                    key,
                    json!(pod.metadata.uid),
                    json!({"vmState": pod.status.phase}),
                );
            }
            output.insert(node.metadata.name.clone(), serde_json::to_value(record)?);
        }
        Ok(output)
    }
}

impl Default for KubernetesCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the normalized record for one cluster node
fn node_record(node: &NodeItem) -> HostRecord {
    let info = &node.status.node_info;

    let mut record = HostRecord::new(&node.metadata.name);
    if !info.machine_id.is_empty() {
        record.host_identifier = info.machine_id.clone();
    }
    record.platform_type = "kubernetes".to_string();
    if !info.os_image.is_empty() {
        record.os = info.os_image.clone();
    }
    if !info.kubelet_version.is_empty() {
        record.os_version = info.kubelet_version.clone();
    }
    if !info.architecture.is_empty() {
        record.cpu_arch = info.architecture.clone();
    }
    record.total_cpu_threads = parse_cpu_quantity(&node.status.capacity.cpu);
    record.ram_mb = parse_quantity(&node.status.capacity.memory) / (1024 * 1024);
    record
}

/// Parse a Kubernetes resource quantity into bytes (`16423060Ki`, `64Gi`, plain)
fn parse_quantity(raw: &str) -> u64 {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, suffix) = raw.split_at(split);
    let Ok(value) = digits.parse::<u64>() else {
        return 0;
    };
    let factor: u64 = match suffix {
        "" => 1,
        "k" | "K" => 1000,
        "M" => 1000 * 1000,
        "G" => 1000 * 1000 * 1000,
        "T" => 1000 * 1000 * 1000 * 1000,
        "Ki" => 1024,
        "Mi" => 1024 * 1024,
        "Gi" => 1024 * 1024 * 1024,
        "Ti" => 1024 * 1024 * 1024 * 1024,
        _ => return 0,
    };
    value.saturating_mul(factor)
}

/// Parse a CPU quantity into whole CPUs (`8`, `7500m`)
fn parse_cpu_quantity(raw: &str) -> u64 {
    let raw = raw.trim();
    if let Some(milli) = raw.strip_suffix('m') {
        milli.parse::<u64>().map(|m| m / 1000).unwrap_or(0)
    } else {
        raw.parse().unwrap_or(0)
    }
}

#[async_trait]
impl Collector for KubernetesCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMETERS
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        if !node.is_filled("url") {
            return Err(ConfigError::MissingParameter("url".to_string()));
        }
        if node.is_filled("client-cert") != node.is_filled("client-key") {
            return Err(ConfigError::InvalidParameter {
                name: "client-cert".to_string(),
                reason: "client-cert and client-key must be set together".to_string(),
            });
        }

        self.url = node.get_str("url").unwrap_or_default().to_string();
        self.username = node.get_str("username").unwrap_or_default().to_string();
        self.password = node.get_str("password").unwrap_or_default().to_string();
        self.client_cert = node.get_str("client-cert").unwrap_or_default().to_string();
        self.client_key = node.get_str("client-key").unwrap_or_default().to_string();
        self.ca_cert = node.get_str("ca-cert").unwrap_or_default().to_string();
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        info!(url = %self.url, "querying Kubernetes API server");
        match self.collect().await {
            Ok(hosts) => Some(hosts),
            Err(e) => {
                error!(url = %self.url, error = %e, "Kubernetes collection failed");
                None
            }
        }
    }
}

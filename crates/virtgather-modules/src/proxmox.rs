//! Proxmox VE module
//!
//! Talks to the Proxmox REST API (`/api2/json`) and reports every online
//! cluster node together with its QEMU and LXC guests. Authentication is
//! either an API token or a username/password ticket, never both.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use virtgather_core::{Collector, ConfigError, ParamDefault, ParamSpec};
use virtgather_schema::{HostMap, HostRecord, TargetRecord, UNKNOWN};

use crate::error::CollectError;
use crate::util::{f64_loose, u64_loose};

const PARAMETERS: &[ParamSpec] = &[
    ParamSpec::new("host", ParamDefault::None),
    ParamSpec::new("port", ParamDefault::None),
    ParamSpec::new("username", ParamDefault::None),
    ParamSpec::new("password", ParamDefault::None),
    ParamSpec::new("api_token_id", ParamDefault::None),
    ParamSpec::new("api_token_secret", ParamDefault::None),
    ParamSpec::new("verify_ssl", ParamDefault::None),
];

#[derive(Debug, Clone)]
enum Auth {
    Token { id: String, secret: String },
    Password { username: String, password: String },
}

/// Proxmox VE collector
pub struct ProxmoxCollector {
    uri: String,
    auth: Option<Auth>,
    verify_ssl: bool,
    timeout: Duration,
}

// API row types

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct NodeEntry {
    node: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize, Default)]
struct NodeStatus {
    #[serde(default)]
    cpuinfo: NodeCpuInfo,
    #[serde(default)]
    memory: NodeMemory,
}

#[derive(Deserialize, Default)]
struct NodeCpuInfo {
    #[serde(default, deserialize_with = "u64_loose")]
    sockets: u64,
    #[serde(default, deserialize_with = "u64_loose")]
    cores: u64,
    #[serde(default, deserialize_with = "u64_loose")]
    cpus: u64,
    #[serde(default, deserialize_with = "f64_loose")]
    mhz: f64,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize, Default)]
struct NodeMemory {
    #[serde(default)]
    total: u64,
}

#[derive(Deserialize, Default)]
struct VersionInfo {
    #[serde(default)]
    release: Option<String>,
}

#[derive(Deserialize)]
struct GuestEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "u64_loose")]
    vmid: u64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "u64_loose")]
    uptime: u64,
    #[serde(default, deserialize_with = "u64_loose")]
    cpus: u64,
    #[serde(default, deserialize_with = "u64_loose")]
    maxmem: u64,
    #[serde(default, deserialize_with = "u64_loose")]
    maxdisk: u64,
}

#[derive(Deserialize, Default)]
struct Ticket {
    #[serde(default)]
    ticket: Option<String>,
    #[serde(default, rename = "CSRFPreventionToken")]
    csrf_token: Option<String>,
}

impl ProxmoxCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uri: String::new(),
            auth: None,
            verify_ssl: true,
            timeout: Duration::from_secs(60),
        }
    }

    fn client(&self) -> Result<Client, CollectError> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .build()?)
    }

    /// Request headers carrying the authentication state
    async fn login(&self, client: &Client) -> Result<HeaderMap, CollectError> {
        let mut headers = HeaderMap::new();
        match &self.auth {
            Some(Auth::Token { id, secret }) => {
                debug!("using API token authentication");
                let value = format!("PVEAPIToken={id}={secret}");
                headers.insert(AUTHORIZATION, header_value(&value)?);
            }
            Some(Auth::Password { username, password }) => {
                debug!("using username/password authentication");
                let url = format!("https://{}/api2/json/access/ticket", self.uri);
                let response = client
                    .post(&url)
                    .form(&[("username", username.as_str()), ("password", password.as_str())])
                    .send()
                    .await?
                    .error_for_status()?;
                let envelope: ApiEnvelope<Ticket> = response.json().await?;
                let ticket = envelope.data.unwrap_or_default();

                let pve_ticket = ticket
                    .ticket
                    .ok_or_else(|| CollectError::Auth("ticket response without a ticket".to_string()))?;
                headers.insert(COOKIE, header_value(&format!("PVEAuthCookie={pve_ticket}"))?);
                if let Some(token) = ticket.csrf_token {
                    headers.insert("CSRFPreventionToken", header_value(&token)?);
                }
            }
            None => return Err(CollectError::Auth("no credentials configured".to_string())),
        }
        Ok(headers)
    }

    async fn get<T>(
        &self,
        client: &Client,
        headers: &HeaderMap,
        path: &str,
    ) -> Result<T, CollectError>
    where
        T: DeserializeOwned + Default,
    {
        let url = format!("https://{}/api2/json/{path}", self.uri);
        let response = client
            .get(&url)
            .headers(headers.clone())
            .send()
            .await?
            .error_for_status()?;
        let envelope: ApiEnvelope<T> = response.json().await?;
        Ok(envelope.data.unwrap_or_default())
    }

    async fn collect(&self) -> Result<HostMap, CollectError> {
        let client = self.client()?;
        let headers = self.login(&client).await?;

        let nodes: Vec<NodeEntry> = self.get(&client, &headers, "nodes").await?;
        if nodes.is_empty() {
            warn!(uri = %self.uri, "no nodes found in Proxmox cluster");
        }

        let mut output = HostMap::new();
        for entry in nodes {
            if entry.status != "online" {
                warn!(node = %entry.node, "node is not online, skipping");
                continue;
            }

            let status: NodeStatus = self
                .get(&client, &headers, &format!("nodes/{}/status", entry.node))
                .await?;
            let version: VersionInfo = self
                .get(&client, &headers, &format!("nodes/{}/version", entry.node))
                .await?;
            let qemu: Vec<GuestEntry> = self
                .get(&client, &headers, &format!("nodes/{}/qemu", entry.node))
                .await?;
            let lxc: Vec<GuestEntry> = self
                .get(&client, &headers, &format!("nodes/{}/lxc", entry.node))
                .await?;

            if qemu.is_empty() && lxc.is_empty() {
                warn!(node = %entry.node, "no guests found on node");
            }

            let record = node_record(&entry.node, &status, &version, &qemu, &lxc);
            output.insert(entry.node, serde_json::to_value(record)?);
        }
        Ok(output)
    }
}

impl Default for ProxmoxCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, CollectError> {
    HeaderValue::from_str(raw)
        .map_err(|_| CollectError::Auth("credential contains invalid header characters".to_string()))
}

/// Build the normalized record for one cluster node
fn node_record(
    name: &str,
    status: &NodeStatus,
    version: &VersionInfo,
    qemu: &[GuestEntry],
    lxc: &[GuestEntry],
) -> HostRecord {
    // Proxmox has no stable node identifier beyond the node name.
    let mut record = HostRecord::new(name);
    record.platform_type = "proxmox".to_string();
    record.os = "ProxmoxVE".to_string();
    record.os_version = version.release.clone().unwrap_or_else(|| UNKNOWN.to_string());
    record.total_cpu_sockets = status.cpuinfo.sockets;
    record.total_cpu_cores = status.cpuinfo.cores;
    record.total_cpu_threads = status.cpuinfo.cpus;
    record.cpu_mhz = status.cpuinfo.mhz;
    record.cpu_description = status.cpuinfo.model.clone().unwrap_or_else(|| UNKNOWN.to_string());
    record.cpu_arch = "x86_64".to_string();
    record.ram_mb = status.memory.total / (1024 * 1024);

    for guest in qemu.iter().chain(lxc) {
        let guest_name = guest.name.clone().unwrap_or_else(|| UNKNOWN.to_string());
        record.insert_vm(
            guest_name,
            json!(guest.vmid),
            json!({
                "vmState": guest.status.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                "proxmoxVmid": guest.vmid,
                "uptime": guest.uptime,
                "totalCpuThreads": guest.cpus,
                "memory": guest.maxmem / (1024 * 1024),
                "disk": guest.maxdisk / (1024 * 1024),
            }),
        );
    }
    record
}

#[async_trait]
impl Collector for ProxmoxCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMETERS
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        if !node.is_filled("host") {
            return Err(ConfigError::MissingParameter("host".to_string()));
        }
        if !node.is_filled("port") {
            return Err(ConfigError::MissingParameter("port".to_string()));
        }

        let password_auth = node.is_filled("username") && node.is_filled("password");
        let token_auth = node.is_filled("api_token_id") && node.is_filled("api_token_secret");
        if password_auth == token_auth {
            return Err(ConfigError::InvalidParameter {
                name: "username".to_string(),
                reason: "either username/password or api_token_id/api_token_secret must be set, \
                         not both"
                    .to_string(),
            });
        }

        self.verify_ssl = match node.get("verify_ssl") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(ConfigError::InvalidParameter {
                    name: "verify_ssl".to_string(),
                    reason: "expected a boolean".to_string(),
                });
            }
        };

        let host = node.get_str("host").unwrap_or_default();
        let port = node.get_u64("port").ok_or_else(|| ConfigError::InvalidParameter {
            name: "port".to_string(),
            reason: "expected a number".to_string(),
        })?;
        self.uri = format!("{host}:{port}");

        self.auth = Some(if token_auth {
            Auth::Token {
                id: node.get_str("api_token_id").unwrap_or_default().to_string(),
                secret: node
                    .get_str("api_token_secret")
                    .unwrap_or_default()
                    .to_string(),
            }
        } else {
            Auth::Password {
                username: node.get_str("username").unwrap_or_default().to_string(),
                password: node.get_str("password").unwrap_or_default().to_string(),
            }
        });
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        info!(uri = %self.uri, "querying Proxmox API");
        match self.collect().await {
            Ok(hosts) => Some(hosts),
            Err(e) => {
                error!(uri = %self.uri, error = %e, "Proxmox collection failed");
                None
            }
        }
    }
}

//! Libvirt module
//!
//! Shells out to `virsh` against the configured connection URI; transports
//! and credentials (qemu+ssh, qemu+tls, ...) are carried by the URI itself.
//! `valid()` reports false when the binary is not installed.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use virtgather_core::{Collector, ConfigError, ParamDefault, ParamSpec, validate_parameters};
use virtgather_schema::{HostMap, HostRecord, TargetRecord, UNKNOWN};

use crate::error::CollectError;

const PARAMETERS: &[ParamSpec] = &[ParamSpec::new("uri", ParamDefault::Empty)];

/// Libvirt collector
pub struct LibvirtCollector {
    uri: String,
    timeout: Duration,
}

/// Parsed `virsh nodeinfo` output
#[derive(Debug, Default, PartialEq)]
struct NodeInfo {
    model: String,
    cpus: u64,
    mhz: f64,
    sockets: u64,
    cores_per_socket: u64,
    memory_kib: u64,
}

impl LibvirtCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            uri: String::new(),
            timeout: Duration::from_secs(60),
        }
    }

    async fn virsh(&self, args: &[&str]) -> Result<String, CollectError> {
        debug!(?args, "running virsh");
        let output = timeout(
            self.timeout,
            Command::new("virsh").args(args).output(),
        )
        .await
        .map_err(|_| CollectError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(CollectError::Command {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn connected(&self, args: &[&str]) -> Result<String, CollectError> {
        let mut full = vec!["-c", self.uri.as_str()];
        full.extend_from_slice(args);
        self.virsh(&full).await
    }

    async fn collect(&self) -> Result<HostMap, CollectError> {
        let hostname = self.connected(&["hostname"]).await?.trim().to_string();
        let info = parse_nodeinfo(&self.connected(&["nodeinfo"]).await?);
        let (os, os_version) = parse_version(&self.connected(&["version"]).await?);

        let mut record = HostRecord::new(&hostname);
        record.platform_type = platform_from_uri(&self.uri);
        record.os = os;
        record.os_version = os_version;
        record.total_cpu_sockets = info.sockets;
        record.total_cpu_cores = info.sockets * info.cores_per_socket;
        record.total_cpu_threads = info.cpus;
        record.cpu_mhz = info.mhz;
        record.cpu_arch = if info.model.is_empty() {
            UNKNOWN.to_string()
        } else {
            info.model
        };
        record.ram_mb = info.memory_kib / 1024;

        let names = self.connected(&["list", "--all", "--name"]).await?;
        for name in names.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let uuid = self.connected(&["domuuid", name]).await?.trim().to_string();
            let state = self.connected(&["domstate", name]).await?;
            record.insert_vm(
                name,
                json!(uuid),
                json!({"vmState": vm_state(state.trim())}),
            );
        }

        let mut output = HostMap::new();
        output.insert(hostname, serde_json::to_value(record)?);
        Ok(output)
    }
}

impl Default for LibvirtCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_nodeinfo(raw: &str) -> NodeInfo {
    let mut info = NodeInfo::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "CPU model" => info.model = value.to_string(),
            "CPU(s)" => info.cpus = value.parse().unwrap_or(0),
            // "2900.000 MHz"
            "CPU frequency" => {
                info.mhz = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0);
            }
            "CPU socket(s)" => info.sockets = value.parse().unwrap_or(0),
            "Core(s) per socket" => info.cores_per_socket = value.parse().unwrap_or(0),
            // "16305212 KiB"
            "Memory size" => {
                info.memory_kib = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
            _ => {}
        }
    }
    info
}

/// Extract hypervisor product and version from `virsh version` output
fn parse_version(raw: &str) -> (String, String) {
    for line in raw.lines() {
        if let Some(rest) = line.trim().strip_prefix("Running hypervisor:") {
            let mut parts = rest.split_whitespace();
            let os = parts.next().unwrap_or(UNKNOWN).to_string();
            let version = parts.next().unwrap_or(UNKNOWN).to_string();
            return (os, version);
        }
    }
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}

/// Platform tag from the connection URI scheme (`qemu+ssh://...` -> `qemu`)
fn platform_from_uri(uri: &str) -> String {
    let scheme = uri.split(':').next().unwrap_or("");
    let driver = scheme.split('+').next().unwrap_or("");
    if driver.is_empty() {
        "libvirt".to_string()
    } else {
        driver.to_lowercase()
    }
}

fn vm_state(raw: &str) -> &'static str {
    match raw {
        "running" | "idle" => "running",
        "shut off" | "in shutdown" => "stopped",
        "paused" => "paused",
        "pmsuspended" => "suspended",
        "crashed" => "crashed",
        _ => UNKNOWN,
    }
}

#[async_trait]
impl Collector for LibvirtCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMETERS
    }

    async fn valid(&self) -> bool {
        self.virsh(&["--version"]).await.is_ok()
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(PARAMETERS, node)?;
        self.uri = node.get_str("uri").unwrap_or_default().to_string();
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        info!(uri = %self.uri, "querying libvirt via virsh");
        match self.collect().await {
            Ok(hosts) => Some(hosts),
            Err(e) => {
                error!(uri = %self.uri, error = %e, "libvirt collection failed");
                None
            }
        }
    }
}

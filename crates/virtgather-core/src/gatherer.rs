//! Dispatch engine: drives every configured target through its module
//!
//! Targets are processed sequentially in input order. Any per-target
//! failure (unknown module, bad configuration, platform error, even a
//! panicking module) is logged and the run continues; the engine itself
//! never fails.

use tracing::{debug, error, info, warn};

use virtgather_schema::{HostMap, TargetRecord};

use crate::collector::ParamSpec;
use crate::registry::Registry;

/// Keys a target may use to name its management endpoint
const ENDPOINT_KEYS: &[&str] = &["host", "hostname", "uri", "url"];

/// Inventory dispatch engine
pub struct Gatherer {
    registry: Registry,
}

impl Gatherer {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run every target and merge the results into one host map
    ///
    /// Module results are flattened: every host key a module reports is
    /// spliced directly into the output. On key collision the later target
    /// overwrites the earlier one.
    pub async fn gather(&self, targets: &[TargetRecord]) -> HostMap {
        let mut output = HostMap::new();

        for node in targets {
            let label = node.label();

            let Some(module) = node.module() else {
                error!(target = %label, "skipping target without a 'module' entry");
                continue;
            };
            let module = module.to_string();

            let mut collector = match self.registry.resolve(&module) {
                Ok(collector) => collector,
                Err(e) => {
                    error!(target = %label, "{e}, skipping");
                    continue;
                }
            };

            if !collector.valid().await {
                error!(
                    module,
                    target = %label,
                    "module runtime dependencies are not available, skipping"
                );
                continue;
            }

            if !has_endpoint(node, collector.parameters()) {
                error!(module, target = %label, "invalid or missing endpoint entry, skipping");
                continue;
            }

            if let Err(e) = collector.set_node(node) {
                error!(module, target = %label, "{e}, skipping");
                continue;
            }

            // Own task so a panicking module cannot abort the whole run.
            let handle = tokio::spawn(async move { collector.run().await });
            match handle.await {
                Ok(Some(hosts)) => {
                    info!(module, target = %label, hosts = hosts.len(), "target collected");
                    for (key, record) in hosts {
                        if output.contains_key(&key) {
                            debug!(host = %key, "duplicate host key, later target overwrites");
                        }
                        output.insert(key, record);
                    }
                }
                Ok(None) => {
                    warn!(module, target = %label, "module returned no data");
                }
                Err(e) => {
                    error!(
                        module,
                        target = %label,
                        error = %e,
                        "module failed unexpectedly, continuing with remaining targets"
                    );
                }
            }
        }

        output
    }
}

/// Generic endpoint pre-check, independent of the module's own schema
///
/// When the module declares one of the endpoint keys as a parameter, at
/// least one declared endpoint key must be filled in the target record.
fn has_endpoint(node: &TargetRecord, params: &[ParamSpec]) -> bool {
    let mut declared = params
        .iter()
        .map(|spec| spec.name)
        .filter(|name| ENDPOINT_KEYS.contains(name))
        .peekable();

    if declared.peek().is_none() {
        return true;
    }
    declared.any(|key| node.is_filled(key))
}

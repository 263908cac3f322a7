//! File module: replay a JSON inventory document
//!
//! Reads a previously captured inventory from a local path, a `file://`
//! URL, or an HTTP(S) URL. Useful for tests and for importing inventories
//! produced elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use virtgather_core::{Collector, ConfigError, ParamDefault, ParamSpec, validate_parameters};
use virtgather_schema::{HostMap, TargetRecord};

use crate::error::CollectError;

const PARAMETERS: &[ParamSpec] = &[ParamSpec::new("url", ParamDefault::Empty)];

/// File replay collector
pub struct FileCollector {
    url: String,
    timeout: Duration,
}

impl FileCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(300),
        }
    }

    async fn fetch(&self) -> Result<Value, CollectError> {
        match Url::parse(&self.url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {
                let client = reqwest::Client::builder().timeout(self.timeout).build()?;
                Ok(client
                    .get(parsed)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?)
            }
            Ok(parsed) if parsed.scheme() == "file" => {
                let path = parsed.to_file_path().map_err(|()| {
                    CollectError::Malformed(format!("not a local file url: {}", self.url))
                })?;
                let raw = tokio::fs::read_to_string(&path).await?;
                Ok(serde_json::from_str(&raw)?)
            }
            // Anything else is treated as a plain filesystem path.
            _ => {
                let raw = tokio::fs::read_to_string(&self.url).await?;
                Ok(serde_json::from_str(&raw)?)
            }
        }
    }
}

impl Default for FileCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for FileCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMETERS
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(PARAMETERS, node)?;
        self.url = node.get_str("url").unwrap_or_default().to_string();
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        debug!(url = %self.url, "fetching inventory document");
        let document = match self.fetch().await {
            Ok(document) => document,
            Err(e) => {
                error!(url = %self.url, error = %e, "unable to fetch inventory document");
                return None;
            }
        };

        let Value::Object(map) = document else {
            error!(url = %self.url, "inventory document is not a JSON object");
            return None;
        };

        // A captured document may nest the host map under a single manager
        // entry; host entries are recognized by their "vms" key.
        if let Some(Value::Object(first)) = map.values().next()
            && !first.contains_key("vms")
        {
            return Some(first.clone().into_iter().collect());
        }

        Some(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn write_fixture(name: &str, content: &Value) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("virtgather-file-{}-{name}", std::process::id()));
        fs::write(&path, serde_json::to_string(content).unwrap()).unwrap();
        path
    }

    fn collector_for(url: &str) -> FileCollector {
        let mut collector = FileCollector::new();
        let node: TargetRecord = serde_json::from_value(json!({"url": url})).unwrap();
        collector.set_node(&node).unwrap();
        collector
    }

    #[test]
    fn test_set_node_requires_url() {
        let mut collector = FileCollector::new();
        let node: TargetRecord = serde_json::from_value(json!({"module": "File"})).unwrap();
        let err = collector.set_node(&node).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(name) if name == "url"));
    }

    #[tokio::test]
    async fn test_replays_host_keyed_document() {
        let fixture = json!({"host1": {"name": "host1", "vms": {}}});
        let path = write_fixture("plain.json", &fixture);

        let output = collector_for(path.to_str().unwrap()).run().await.unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(output["host1"], fixture["host1"]);
    }

    #[tokio::test]
    async fn test_unwraps_manager_nested_document() {
        let fixture = json!({
            "manager-1": {
                "host1": {"name": "host1", "vms": {"vm1": "uuid-1"}},
                "host2": {"name": "host2", "vms": {}}
            }
        });
        let path = write_fixture("nested.json", &fixture);

        let output = collector_for(path.to_str().unwrap()).run().await.unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(output.len(), 2);
        assert_eq!(output["host1"]["vms"]["vm1"], "uuid-1");
    }

    #[tokio::test]
    async fn test_accepts_file_url() {
        let fixture = json!({"host1": {"name": "host1", "vms": {}}});
        let path = write_fixture("url.json", &fixture);

        let url = format!("file://{}", path.display());
        let output = collector_for(&url).run().await.unwrap();
        fs::remove_file(&path).unwrap();

        assert!(output.contains_key("host1"));
    }

    #[tokio::test]
    async fn test_missing_file_reports_no_data() {
        let output = collector_for("/nonexistent/fixture.json").run().await;
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn test_non_object_document_reports_no_data() {
        let path = write_fixture("array.json", &json!(["not", "an", "object"]));

        let output = collector_for(path.to_str().unwrap()).run().await;
        fs::remove_file(&path).unwrap();

        assert!(output.is_none());
    }
}

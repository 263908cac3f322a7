//! Dispatch engine integration tests with mock collectors

use async_trait::async_trait;
use serde_json::{Value, json};

use virtgather_core::{
    Collector, ConfigError, Gatherer, ParamDefault, ParamSpec, Registry, validate_parameters,
};
use virtgather_schema::{HostMap, TargetRecord};

// Mock implementations

/// Returns a single host whose key and value come from the target record
struct StaticCollector {
    key: String,
    payload: String,
}

const STATIC_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("host", ParamDefault::None),
    ParamSpec::new("payload", ParamDefault::None),
];

#[async_trait]
impl Collector for StaticCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        STATIC_PARAMS
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(STATIC_PARAMS, node)?;
        self.key = node.get_str("host").unwrap_or_default().to_string();
        self.payload = node.get_str("payload").unwrap_or_default().to_string();
        Ok(())
    }

    async fn run(&self) -> Option<HostMap> {
        let mut hosts = HostMap::new();
        hosts.insert(self.key.clone(), Value::String(self.payload.clone()));
        Some(hosts)
    }
}

/// Always reports a failed platform query
struct EmptyCollector;

const HOST_ONLY: &[ParamSpec] = &[ParamSpec::new("host", ParamDefault::None)];

#[async_trait]
impl Collector for EmptyCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        HOST_ONLY
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(HOST_ONLY, node)
    }

    async fn run(&self) -> Option<HostMap> {
        None
    }
}

/// Panics during collection, standing in for a module programming error
struct PanickyCollector;

#[async_trait]
impl Collector for PanickyCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        HOST_ONLY
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(HOST_ONLY, node)
    }

    async fn run(&self) -> Option<HostMap> {
        panic!("module bug");
    }
}

/// Runtime dependency missing
struct UnavailableCollector;

#[async_trait]
impl Collector for UnavailableCollector {
    fn parameters(&self) -> &'static [ParamSpec] {
        HOST_ONLY
    }

    async fn valid(&self) -> bool {
        false
    }

    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
        validate_parameters(HOST_ONLY, node)
    }

    async fn run(&self) -> Option<HostMap> {
        let mut hosts = HostMap::new();
        hosts.insert("should-not-appear".to_string(), json!({}));
        Some(hosts)
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("Static", || {
        Box::new(StaticCollector {
            key: String::new(),
            payload: String::new(),
        })
    });
    registry.register("Empty", || Box::new(EmptyCollector));
    registry.register("Panicky", || Box::new(PanickyCollector));
    registry.register("Unavailable", || Box::new(UnavailableCollector));
    registry
}

fn targets(value: Value) -> Vec<TargetRecord> {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_unknown_module_yields_empty_output() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([{"module": "Unknown", "host": "x"}])))
        .await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_target_without_module_is_skipped() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([
            {"host": "x", "payload": "y"},
            {"module": "Static", "host": "hostA", "payload": "data"}
        ])))
        .await;
    assert_eq!(output.len(), 1);
    assert_eq!(output["hostA"], "data");
}

#[tokio::test]
async fn test_missing_endpoint_is_skipped() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([{"module": "Static", "payload": "data"}])))
        .await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_missing_parameter_is_skipped() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([{"module": "Static", "host": "hostA"}])))
        .await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_results_are_flattened_across_targets() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([
            {"module": "Static", "host": "hostA", "payload": "a"},
            {"module": "Static", "host": "hostB", "payload": "b"}
        ])))
        .await;
    assert_eq!(output.len(), 2);
    assert_eq!(output["hostA"], "a");
    assert_eq!(output["hostB"], "b");
}

#[tokio::test]
async fn test_later_target_overwrites_on_key_collision() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([
            {"module": "Static", "host": "hostA", "payload": "first"},
            {"module": "Static", "host": "hostA", "payload": "second"}
        ])))
        .await;
    assert_eq!(output.len(), 1);
    assert_eq!(output["hostA"], "second");
}

#[tokio::test]
async fn test_no_data_result_writes_nothing() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([
            {"module": "Empty", "host": "unreachable.example.com"},
            {"module": "Static", "host": "hostA", "payload": "data"}
        ])))
        .await;
    assert_eq!(output.len(), 1);
    assert_eq!(output["hostA"], "data");
}

#[tokio::test]
async fn test_panicking_module_does_not_abort_the_run() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([
            {"module": "Panicky", "host": "x"},
            {"module": "Static", "host": "hostA", "payload": "data"}
        ])))
        .await;
    assert_eq!(output.len(), 1);
    assert_eq!(output["hostA"], "data");
}

#[tokio::test]
async fn test_unavailable_module_is_skipped() {
    let gatherer = Gatherer::new(registry());
    let output = gatherer
        .gather(&targets(json!([{"module": "Unavailable", "host": "x"}])))
        .await;
    assert!(output.is_empty());
}

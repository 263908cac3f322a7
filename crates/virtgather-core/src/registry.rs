//! Static registry of available collector modules
//!
//! Modules are registered explicitly at startup; there is no runtime
//! discovery. Lookup is case-sensitive exact match.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::collector::Collector;
use crate::error::ConfigError;

type Factory = Box<dyn Fn() -> Box<dyn Collector> + Send + Sync>;

/// Registration table mapping module name to collector factory
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<&'static str, Factory>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `name`
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn() -> Box<dyn Collector> + Send + Sync + 'static,
    {
        self.entries.insert(name, Box::new(factory));
    }

    /// Construct a fresh collector for `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownModule`] when no module is registered
    /// under that exact name.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Collector>, ConfigError> {
        self.entries
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::UnknownModule(name.to_string()))
    }

    /// Registered module names, sorted
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Parameter templates for every registered module
    ///
    /// Each entry carries the module's declared parameter defaults plus a
    /// `module` key equal to the module name. Requires no network access.
    #[must_use]
    pub fn list_available(&self) -> Map<String, Value> {
        let mut listing = Map::new();
        for (name, factory) in &self.entries {
            let collector = factory();
            let mut params = Map::new();
            for spec in collector.parameters() {
                params.insert(spec.name.to_string(), spec.default.to_value());
            }
            params.insert("module".to_string(), Value::String((*name).to_string()));
            listing.insert((*name).to_string(), Value::Object(params));
        }
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ParamDefault, ParamSpec, validate_parameters};
    use async_trait::async_trait;
    use virtgather_schema::{HostMap, TargetRecord};

    struct NullCollector;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::new("url", ParamDefault::Empty),
        ParamSpec::new("port", ParamDefault::Int(8080)),
    ];

    #[async_trait]
    impl Collector for NullCollector {
        fn parameters(&self) -> &'static [ParamSpec] {
            PARAMS
        }

        fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError> {
            validate_parameters(PARAMS, node)
        }

        async fn run(&self) -> Option<HostMap> {
            Some(HostMap::new())
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register("Null", || Box::new(NullCollector));
        registry
    }

    #[test]
    fn test_resolve_known_module() {
        assert!(registry().resolve("Null").is_ok());
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let err = registry().resolve("null").err().unwrap();
        assert!(matches!(err, ConfigError::UnknownModule(name) if name == "null"));
    }

    #[test]
    fn test_list_available_carries_defaults_and_module_key() {
        let listing = registry().list_available();
        assert_eq!(listing.len(), 1);

        let entry = listing["Null"].as_object().unwrap();
        assert_eq!(entry["module"], "Null");
        assert_eq!(entry["url"], "");
        assert_eq!(entry["port"], 8080);
    }
}

//! Target record: one configured management endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the JSON input file
///
/// Apart from `module` and the optional `id`/`name`, all fields are opaque
/// to the dispatch engine and interpreted only by the selected module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRecord(Map<String, Value>);

impl TargetRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Name of the module that should handle this target
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        self.get_str("module")
    }

    /// Identifier used in log messages: `id`, then `name`, then `module`
    #[must_use]
    pub fn label(&self) -> String {
        self.get_str("id")
            .or_else(|| self.get_str("name"))
            .or_else(|| self.module())
            .unwrap_or("<unnamed>")
            .to_string()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Read a numeric field, accepting both numbers and numeric strings
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether `key` is present with a usable value
    ///
    /// Null and empty strings count as absent; any other value, including
    /// `false` and `0`, counts as filled.
    #[must_use]
    pub fn is_filled(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

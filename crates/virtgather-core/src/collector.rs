//! Collector contract shared by every platform module

use async_trait::async_trait;
use serde_json::Value;

use virtgather_schema::{HostMap, TargetRecord};

use crate::error::ConfigError;

/// Default value of a declared parameter, used for configuration templates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    /// No default; the value must come from the input file
    None,
    /// Empty string
    Empty,
    /// Fixed string default
    Str(&'static str),
    /// Fixed integer default
    Int(i64),
}

impl ParamDefault {
    /// JSON representation for the module listing output
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::None => Value::Null,
            ParamDefault::Empty => Value::String(String::new()),
            ParamDefault::Str(s) => Value::String(s.to_string()),
            ParamDefault::Int(i) => Value::from(i),
        }
    }
}

/// One declared configuration parameter of a module
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Key expected in the target record
    pub name: &'static str,
    /// Template default
    pub default: ParamDefault,
}

impl ParamSpec {
    #[must_use]
    pub const fn new(name: &'static str, default: ParamDefault) -> Self {
        Self { name, default }
    }
}

/// Platform adapter contract
///
/// One instance is constructed per target record, configured through
/// `set_node`, executed once through `run`, then discarded. Implementations
/// hold no state shared across targets.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Declared configuration parameters, in listing order
    fn parameters(&self) -> &'static [ParamSpec];

    /// Whether the module's runtime dependencies are present
    ///
    /// Checked before `set_node`/`run`; a false result skips the target.
    async fn valid(&self) -> bool {
        true
    }

    /// Validate the target record and store connection settings
    ///
    /// The default rule is [`validate_parameters`]; modules with
    /// platform-specific constraints implement their own checks.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] naming the offending parameter. The engine
    /// logs it and skips the target.
    fn set_node(&mut self, node: &TargetRecord) -> Result<(), ConfigError>;

    /// Execute one collection pass
    ///
    /// Returns the discovered hosts keyed by host name, or `None` when the
    /// platform query failed. Platform-level failures (connectivity, auth,
    /// malformed responses) must be caught and logged inside the module,
    /// never propagated.
    async fn run(&self) -> Option<HostMap>;
}

/// Default validation rule: every declared parameter must be present and
/// non-empty in the target record
///
/// # Errors
/// Returns [`ConfigError::MissingParameter`] naming the first missing key.
pub fn validate_parameters(params: &[ParamSpec], node: &TargetRecord) -> Result<(), ConfigError> {
    for spec in params {
        if !node.is_filled(spec.name) {
            return Err(ConfigError::MissingParameter(spec.name.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::new("hostname", ParamDefault::Empty),
        ParamSpec::new("port", ParamDefault::Int(443)),
        ParamSpec::new("username", ParamDefault::Empty),
    ];

    fn target(value: serde_json::Value) -> TargetRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        let node = target(json!({
            "hostname": "mgmt.example.com",
            "port": 443,
            "username": "monitor"
        }));
        assert!(validate_parameters(PARAMS, &node).is_ok());
    }

    #[test]
    fn test_validate_names_first_missing_parameter() {
        let node = target(json!({"hostname": "mgmt.example.com"}));
        let err = validate_parameters(PARAMS, &node).unwrap_err();
        assert_eq!(err.to_string(), "missing parameter or value 'port'");
    }

    #[test]
    fn test_validate_rejects_empty_value() {
        let node = target(json!({
            "hostname": "",
            "port": 443,
            "username": "monitor"
        }));
        let err = validate_parameters(PARAMS, &node).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(name) if name == "hostname"));
    }

    #[test]
    fn test_param_default_to_value() {
        assert_eq!(ParamDefault::None.to_value(), Value::Null);
        assert_eq!(ParamDefault::Empty.to_value(), json!(""));
        assert_eq!(ParamDefault::Str("x").to_value(), json!("x"));
        assert_eq!(ParamDefault::Int(443).to_value(), json!(443));
    }
}

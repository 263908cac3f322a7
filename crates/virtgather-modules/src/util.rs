//! Deserialization helpers for loosely typed platform APIs
//!
//! Several platform APIs report numbers inconsistently as JSON numbers or
//! numeric strings (Proxmox `mhz` is the usual offender). These helpers
//! accept both and fall back to zero.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn u64_loose<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as u64).unwrap_or(0),
        _ => 0,
    })
}

pub fn f64_loose<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "u64_loose")]
        count: u64,
        #[serde(default, deserialize_with = "f64_loose")]
        mhz: f64,
    }

    #[test]
    fn test_accepts_numbers() {
        let row: Row = serde_json::from_value(json!({"count": 8, "mhz": 2900.5})).unwrap();
        assert_eq!(row.count, 8);
        assert_eq!(row.mhz, 2900.5);
    }

    #[test]
    fn test_accepts_numeric_strings() {
        let row: Row =
            serde_json::from_value(json!({"count": "16", "mhz": "2900.000"})).unwrap();
        assert_eq!(row.count, 16);
        assert_eq!(row.mhz, 2900.0);
    }

    #[test]
    fn test_fractional_count_truncates() {
        let row: Row = serde_json::from_value(json!({"count": 2.9, "mhz": 0})).unwrap();
        assert_eq!(row.count, 2);
    }

    #[test]
    fn test_garbage_falls_back_to_zero() {
        let row: Row = serde_json::from_value(json!({"count": "n/a", "mhz": null})).unwrap();
        assert_eq!(row.count, 0);
        assert_eq!(row.mhz, 0.0);
    }

    #[test]
    fn test_absent_fields_default() {
        let row: Row = serde_json::from_value(json!({})).unwrap();
        assert_eq!(row.count, 0);
        assert_eq!(row.mhz, 0.0);
    }
}

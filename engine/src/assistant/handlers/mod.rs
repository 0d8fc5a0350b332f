//! Per-category handlers for executed classifications
//!
//! Every handler takes the classification's `action` and `data` and returns
//! the JSON `result` the client shows. Unsupported actions are not errors;
//! they answer `{"message": "Action not implemented"}`.

pub mod calendar;
pub mod finance;
pub mod health;
pub mod journal;
pub mod notes;
pub mod shopping;
pub mod travel;

use crate::db::Database;
use crate::travel::TravelTimeSource;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

/// What a handler may touch while executing one classification
#[derive(Clone)]
pub struct HandlerContext {
    pub db: Database,
    pub user_id: String,
    pub travel: Arc<dyn TravelTimeSource>,
    /// Skip calendar conflict detection
    pub force: bool,
    pub now: DateTime<Utc>,
}

pub(crate) fn not_implemented() -> Value {
    json!({ "message": "Action not implemented" })
}

/// Non-empty trimmed string; numbers are stringified
pub(crate) fn str_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Number or numeric string such as `"45.90"`
pub(crate) fn f64_field(data: &Value, key: &str) -> Option<f64> {
    match data.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// `true`, `"true"` or a non-zero number
pub(crate) fn bool_field(data: &Value, key: &str) -> bool {
    match data.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}

/// Array of strings, or one comma separated string
pub(crate) fn tags_field(data: &Value, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_helpers() {
        let data = json!({
            "title": "  Dentist ",
            "empty": "  ",
            "amount": "45.90",
            "count": 3,
            "paid": "TRUE",
            "tags": ["a", " ", "b"],
            "csv": "x, y,,z"
        });

        assert_eq!(str_field(&data, "title").as_deref(), Some("Dentist"));
        assert_eq!(str_field(&data, "empty"), None);
        assert_eq!(str_field(&data, "count").as_deref(), Some("3"));
        assert_eq!(f64_field(&data, "amount"), Some(45.9));
        assert_eq!(f64_field(&data, "title"), None);
        assert!(bool_field(&data, "paid"));
        assert!(!bool_field(&data, "missing"));
        assert_eq!(tags_field(&data, "tags"), vec!["a", "b"]);
        assert_eq!(tags_field(&data, "csv"), vec!["x", "y", "z"]);
        assert!(tags_field(&Value::Null, "tags").is_empty());
    }
}

//! Seeding template values from JSON
//!
//! Hosts frequently hold the data a template renders as JSON. These
//! conversions turn `serde_json` values into engine [`Value`]s so they
//! can seed the environment globals or a render's locals. Numbers
//! become integers when they fit, floats otherwise.

use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use crate::value::Value;

/// Convert a JSON value into an engine value.
pub fn from_json(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::None,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(from_json).collect()),
        JsonValue::Object(map) => Value::Dict(
            map.iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect(),
        ),
    }
}

/// Convert a JSON object into a variable map; `None` for non-objects.
pub fn dict_from_json(value: &JsonValue) -> Option<FxHashMap<String, Value>> {
    match value {
        JsonValue::Object(map) => Some(
            map.iter()
                .map(|(key, value)| (key.clone(), from_json(value)))
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(from_json(&serde_json::json!(null)), Value::None);
        assert_eq!(from_json(&serde_json::json!(true)), Value::Bool(true));
        assert_eq!(from_json(&serde_json::json!(3)), Value::Int(3));
        assert_eq!(from_json(&serde_json::json!(2.5)), Value::Float(2.5));
        assert_eq!(
            from_json(&serde_json::json!("hi")),
            Value::Str("hi".to_string())
        );
    }

    #[test]
    fn test_container_conversion() {
        let json = serde_json::json!({"items": [1, 2], "name": "x"});
        let vars = dict_from_json(&json).unwrap();
        assert_eq!(
            vars.get("items"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(vars.get("name"), Some(&Value::Str("x".to_string())));

        assert!(dict_from_json(&serde_json::json!([1])).is_none());
    }
}

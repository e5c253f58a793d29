//! Coercion of a bound value to the string a template placeholder expects
//! (§4.4 `renderTemplate`).

use serde_json::Value;

/// `null`/missing → empty string; arrays joined with `", "`; objects
/// JSON-stringified; primitives coerced the way JS template-literal
/// interpolation would.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

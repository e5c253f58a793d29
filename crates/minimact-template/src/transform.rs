//! The binding transform whitelist (§4.4).
//!
//! Exact spelling matters — these are matched literally, not parsed as a
//! general expression grammar, because the set is closed and small.

use serde_json::Value;

fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

fn as_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => super::format::format_value(value),
    }
}

fn as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Apply one whitelisted transform to a resolved binding value. Unknown
/// transforms log a warning and pass the value through unchanged, per
/// §4.4 / §7 ("unknown transform: pass through with warning").
pub fn apply_transform(value: &Value, transform: &str) -> Value {
    let trimmed = transform.trim();

    if let Some(digits) = trimmed
        .strip_prefix("toFixed(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return match digits.trim().parse::<usize>() {
            Ok(n) => Value::String(format!("{:.*}", n, as_number(value))),
            Err(_) => {
                tracing::warn!(transform = trimmed, "malformed toFixed argument, passing through");
                value.clone()
            }
        };
    }

    if let Some(rest) = trimmed.strip_prefix('*') {
        return arithmetic(value, rest, |a, b| a * b);
    }
    if let Some(rest) = trimmed.strip_prefix('/') {
        return arithmetic(value, rest, |a, b| a / b);
    }
    if let Some(rest) = trimmed.strip_prefix('+') {
        return arithmetic(value, rest, |a, b| a + b);
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        return arithmetic(value, rest, |a, b| a - b);
    }

    match trimmed {
        "toUpperCase()" | "toUpperCase" => Value::String(as_display_string(value).to_uppercase()),
        "toLowerCase()" | "toLowerCase" => Value::String(as_display_string(value).to_lowercase()),
        "trim()" | "trim" => Value::String(as_display_string(value).trim().to_string()),
        "!" => Value::Bool(!as_bool(value)),
        other => {
            tracing::warn!(transform = other, "unknown transform, passing value through");
            value.clone()
        }
    }
}

fn arithmetic(value: &Value, operand: &str, op: impl Fn(f64, f64) -> f64) -> Value {
    match operand.trim().parse::<f64>() {
        Ok(n) => Value::from(op(as_number(value), n)),
        Err(_) => {
            tracing::warn!(operand, "malformed arithmetic transform operand, passing through");
            value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_fixed_formats_decimal_places() {
        assert_eq!(apply_transform(&json!(3.14159), "toFixed(2)"), json!("3.14"));
    }

    #[test]
    fn arithmetic_transforms() {
        assert_eq!(apply_transform(&json!(10), "* 2"), json!(20.0));
        assert_eq!(apply_transform(&json!(10), "/ 2"), json!(5.0));
        assert_eq!(apply_transform(&json!(10), "+ 1"), json!(11.0));
        assert_eq!(apply_transform(&json!(10), "- 1"), json!(9.0));
    }

    #[test]
    fn string_case_transforms() {
        assert_eq!(apply_transform(&json!("Hi"), "toUpperCase()"), json!("HI"));
        assert_eq!(apply_transform(&json!("Hi"), "toLowerCase"), json!("hi"));
        assert_eq!(apply_transform(&json!("  hi  "), "trim()"), json!("hi"));
    }

    #[test]
    fn negation_transform() {
        assert_eq!(apply_transform(&json!(true), "!"), json!(false));
        assert_eq!(apply_transform(&json!(false), "!"), json!(true));
    }

    #[test]
    fn unknown_transform_passes_through() {
        assert_eq!(apply_transform(&json!("x"), "reverse()"), json!("x"));
    }
}

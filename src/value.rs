//! Shared value helpers for templates and conditions.
//!
//! Data contexts are plain `serde_json::Value` trees. These helpers provide
//! the null-safe dotted-path lookup both the template engine and the condition
//! evaluator rely on, the textual form values take when substituted into a
//! template, and the literal coercion applied when conditions are authored.

use serde_json::{Map, Number, Value};

/// Resolve a dot-separated path against a data context.
///
/// Object segments are looked up by key; array segments must be a decimal
/// index. Returns `None` when the path is empty, when any segment is missing,
/// or when an intermediate value is not a container (including `null`).
///
/// A leaf `null` is returned as `Some(&Value::Null)` so callers can decide how
/// to treat it.
///
/// ```
/// use mediatask::value::resolve_path;
/// use serde_json::json;
///
/// let data = json!({"a": {"b": "x"}, "tags": ["one", "two"]});
/// assert_eq!(resolve_path(&data, "a.b"), Some(&json!("x")));
/// assert_eq!(resolve_path(&data, "tags.1"), Some(&json!("two")));
/// assert_eq!(resolve_path(&data, "a.c"), None);
/// ```
pub fn resolve_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }

    let mut current = data;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Write `value` at a dot-separated path, creating intermediate objects.
///
/// `null` intermediates are replaced by empty objects. Returns `false` (and
/// leaves `data` untouched at that point) when the path is empty or an
/// intermediate value is a scalar or array.
pub fn set_path(data: &mut Value, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = data;
    for segment in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        let map = match current {
            Value::Object(map) => map,
            _ => return false,
        };
        current = map.entry(segment.to_string()).or_insert(Value::Null);
    }

    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        _ => false,
    }
}

/// Convert a value to the text substituted into a template.
///
/// - strings are returned verbatim
/// - booleans print as `true` / `false`
/// - integral numbers print without a fractional part (`5.0` becomes `5`)
/// - arrays print their elements joined by `,`
/// - objects print as compact JSON
/// - `null` prints as the empty string
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn number_to_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Coerce free text typed into a condition builder into a comparable literal.
///
/// Returns `true` / `false` for those exact words, a number when the trimmed
/// text parses completely as a finite number, and the original text otherwise.
///
/// ```
/// use mediatask::value::coerce_to_comparable;
/// use serde_json::json;
///
/// assert_eq!(coerce_to_comparable("true"), json!(true));
/// assert_eq!(coerce_to_comparable(" 42 "), json!(42));
/// assert_eq!(coerce_to_comparable("portrait"), json!("portrait"));
/// ```
pub fn coerce_to_comparable(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "" => return Value::String(raw.to_string()),
        _ => {}
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && looks_numeric(trimmed) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::Number(Number::from(f as i64))
            } else {
                Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(raw.to_string()))
            }
        }
        _ => Value::String(raw.to_string()),
    }
}

/// Rust's float parser accepts words like `inf` and `NaN`; numeric literals
/// authored in a builder are digits, sign, point, and exponent only.
fn looks_numeric(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

/// Strict equality between a resolved value and an expected literal.
///
/// A missing value (`None`) equals nothing. Numbers compare by numeric value,
/// so `5` equals `5.0`. All other values compare structurally with no type
/// coercion: `"5"` does not equal `5` and `"true"` does not equal `true`.
pub fn values_equal(actual: Option<&Value>, expected: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a == b
            } else {
                a.as_f64() == b.as_f64()
            }
        }
        _ => actual == expected,
    }
}

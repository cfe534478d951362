//! Flattening of nested JSON values into dotted keys.

use serde_json::{Map, Value};

/// Flattens nested objects and arrays into `a.b.c` / `d[0]` keys.
///
/// Scalars are kept as-is. Empty objects and arrays are kept as values so no
/// key disappears.
///
/// ```rust
/// use sentinel_guard::core::flatten_object;
/// use serde_json::json;
///
/// let nested = json!({"a": {"b": 1}, "d": [10, {"e": true}]});
/// let flat = flatten_object(nested.as_object().unwrap());
/// assert_eq!(flat["a.b"], json!(1));
/// assert_eq!(flat["d[0]"], json!(10));
/// assert_eq!(flat["d[1].e"], json!(true));
/// ```
pub fn flatten_object(object: &Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (key, value) in object {
        flatten_into(key.clone(), value, &mut flat);
    }
    flat
}

fn flatten_into(prefix: String, value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(format!("{prefix}.{key}"), inner, out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, inner) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{index}]"), inner, out);
            }
        }
        other => {
            out.insert(prefix, other.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_rows_are_unchanged() {
        let row = json!({"check_name": "a", "value": 3});
        let flat = flatten_object(row.as_object().unwrap());
        assert_eq!(Value::Object(flat), row);
    }

    #[test]
    fn test_nested_and_empty_values() {
        let row = json!({"stats": {"p50": 1.5, "tags": []}, "meta": {}});
        let flat = flatten_object(row.as_object().unwrap());
        assert_eq!(flat["stats.p50"], json!(1.5));
        assert_eq!(flat["stats.tags"], json!([]));
        assert_eq!(flat["meta"], json!({}));
        assert_eq!(flat.len(), 3);
    }
}

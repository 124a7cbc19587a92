//! JSON utility functions

use serde_json::Value as JsonValue;

/// Scalars are everything except arrays and objects
pub fn is_scalar(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Array(_) | JsonValue::Object(_))
}

/// Nesting depth of a JSON value (scalars are 0, `[]` and `{}` are 1)
pub fn depth(value: &JsonValue) -> usize {
    match value {
        JsonValue::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        JsonValue::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Flatten a JSON object into `(key path, leaf)` pairs in insertion order
///
/// Arrays, scalars and empty objects are leaves. A non-object input yields a
/// single pair with an empty path.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use metafilter::utils::json::flatten_leaves;
///
/// let value = json!({"a": {"b": 1, "c": [2]}, "d": "x"});
/// let leaves = flatten_leaves(&value);
/// assert_eq!(leaves.len(), 3);
/// assert_eq!(leaves[0].0, vec!["a", "b"]);
/// assert_eq!(leaves[1].1, &json!([2]));
/// ```
pub fn flatten_leaves(value: &JsonValue) -> Vec<(Vec<&str>, &JsonValue)> {
    let mut leaves = Vec::new();
    collect_leaves(value, &mut Vec::new(), &mut leaves);
    leaves
}

fn collect_leaves<'a>(
    value: &'a JsonValue,
    prefix: &mut Vec<&'a str>,
    leaves: &mut Vec<(Vec<&'a str>, &'a JsonValue)>,
) {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                prefix.push(key.as_str());
                collect_leaves(child, prefix, leaves);
                prefix.pop();
            }
        }
        _ => leaves.push((prefix.clone(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_scalar() {
        assert!(is_scalar(&json!(1)));
        assert!(is_scalar(&json!("a")));
        assert!(is_scalar(&JsonValue::Null));
        assert!(!is_scalar(&json!([1])));
        assert!(!is_scalar(&json!({"a": 1})));
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(&json!(1)), 0);
        assert_eq!(depth(&json!([])), 1);
        assert_eq!(depth(&json!({"a": {"b": [1]}})), 3);
    }

    #[test]
    fn test_flatten_nested_object() {
        let value = json!({"profile": {"age": 30, "name": "x"}, "active": true});
        let leaves = flatten_leaves(&value);
        assert_eq!(
            leaves,
            vec![
                (vec!["profile", "age"], &json!(30)),
                (vec!["profile", "name"], &json!("x")),
                (vec!["active"], &json!(true)),
            ]
        );
    }

    #[test]
    fn test_flatten_keeps_empty_object_as_leaf() {
        let value = json!({"a": {}});
        let leaves = flatten_leaves(&value);
        assert_eq!(leaves, vec![(vec!["a"], &json!({}))]);
    }

    #[test]
    fn test_flatten_scalar_input() {
        let value = json!(5);
        let leaves = flatten_leaves(&value);
        assert_eq!(leaves, vec![(Vec::<&str>::new(), &json!(5))]);
    }
}

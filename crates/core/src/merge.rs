//! Recursive structural merge for configuration trees.
//!
//! Object subtrees merge key-by-key; arrays and scalars from the source
//! replace whatever the target held. Used to layer base config < custom
//! config < runtime overrides.

use serde_json::{Map, Value};

/// Merge `source` into `target` in place and return `target`.
///
/// For every key in `source`:
/// - an object value is merged recursively into `target[key]`, which is
///   first replaced by an empty object when absent or not an object;
/// - any other value (arrays included, `null` included) replaces
///   `target[key]` verbatim.
///
/// Non-object inputs leave `target` unchanged. Cyclic input cannot be
/// expressed as a `serde_json::Value`, so recursion always terminates.
pub fn merge_deep<'a>(target: &'a mut Value, source: &Value) -> &'a mut Value {
    if let (Some(target_map), Some(source_map)) = (target.as_object_mut(), source.as_object()) {
        merge_maps(target_map, source_map);
    }
    target
}

/// Return a fresh tree holding `base` with `overlay` merged on top.
pub fn merged(base: &Value, overlay: &Value) -> Value {
    let mut out = base.clone();
    merge_deep(&mut out, overlay);
    out
}

fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(child) => {
                let slot = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(slot_map) = slot {
                    merge_maps(slot_map, child);
                }
            }
            other => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adds_new_keys() {
        let result = merged(&json!({"a": 1}), &json!({"b": 2}));
        assert_eq!(result, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn source_scalar_wins() {
        let result = merged(&json!({"a": 1, "b": 2}), &json!({"b": 99}));
        assert_eq!(result, json!({"a": 1, "b": 99}));
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let base = json!({"api": {"baseURL": "/api", "headers": {"Accept": "application/json"}}});
        let overlay = json!({"api": {"headers": {"X-Trace": "1"}}});
        let result = merged(&base, &overlay);
        assert_eq!(
            result,
            json!({"api": {"baseURL": "/api", "headers": {"Accept": "application/json", "X-Trace": "1"}}})
        );
    }

    #[test]
    fn arrays_are_replaced_wholesale() {
        let base = json!({"rules": ["required", "email"]});
        let overlay = json!({"rules": ["nullable"]});
        assert_eq!(merged(&base, &overlay), json!({"rules": ["nullable"]}));
    }

    #[test]
    fn object_replaces_scalar_in_target() {
        let base = json!({"errors": "flat"});
        let overlay = json!({"errors": {"401": {"message": "nope"}}});
        assert_eq!(
            merged(&base, &overlay),
            json!({"errors": {"401": {"message": "nope"}}})
        );
    }

    #[test]
    fn null_in_source_replaces() {
        let result = merged(&json!({"redirect": "/home"}), &json!({"redirect": null}));
        assert_eq!(result, json!({"redirect": null}));
    }

    #[test]
    fn base_only_keys_survive() {
        let base = json!({"selector": "#login", "fields": {"email": {"rules": ["required"]}}});
        let overlay = json!({"endpoint": "/login"});
        let result = merged(&base, &overlay);
        assert_eq!(result["selector"], "#login");
        assert_eq!(result["fields"]["email"]["rules"], json!(["required"]));
        assert_eq!(result["endpoint"], "/login");
    }

    #[test]
    fn non_object_source_returns_target_unchanged() {
        let mut target = json!({"a": 1});
        merge_deep(&mut target, &json!("not an object"));
        assert_eq!(target, json!({"a": 1}));
    }

    #[test]
    fn non_object_target_returns_target_unchanged() {
        let mut target = json!(42);
        merge_deep(&mut target, &json!({"a": 1}));
        assert_eq!(target, json!(42));
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let a = json!({"a": 1, "nested": {"x": [1, 2]}});
        let b = json!({"b": 2, "nested": {"y": true}});
        let once = merged(&a, &b);
        let twice = merged(&once, &b);
        assert_eq!(once, twice);
    }
}

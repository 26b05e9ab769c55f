//! Response projection
//!
//! Runs every export path against a response body and folds the partial
//! results into a single object, in path order.

use super::export_path::extract;
use super::merge::merge_into;
use serde_json::{Map, Value};

/// Project `paths` out of `body`. Unresolvable paths contribute nothing.
pub fn project<S: AsRef<str>>(body: &Value, paths: &[S]) -> Value {
    let mut output = Value::Object(Map::new());

    for path in paths {
        let path = path.as_ref();
        match extract(body, path) {
            Some(part) => merge_into(&mut output, part),
            None => tracing::trace!("export path {:?} not present in response", path),
        }
    }

    output
}

/// Project and serialize for the `output` state field
pub fn project_to_string<S: AsRef<str>>(body: &Value, paths: &[S]) -> String {
    project(body, paths).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_paths_is_empty_object() {
        let body = json!({"a": 1});
        let paths: [&str; 0] = [];
        assert_eq!(project(&body, &paths), json!({}));
        assert_eq!(project_to_string(&Value::Null, &paths), "{}");
    }

    #[test]
    fn test_single_path() {
        let body = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(project(&body, &["a.b"]), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_unresolvable_path_is_skipped() {
        let body = json!({"a": 1});
        assert_eq!(project(&body, &["a.b.c"]), json!({}));
        assert_eq!(project(&body, &["a.b.c", "a"]), json!({"a": 1}));
    }

    #[test]
    fn test_paths_merge_by_position() {
        let body = json!({
            "id": "/x",
            "properties": {
                "provisioningState": "Succeeded",
                "sku": {"name": "S1", "tier": "Standard"},
                "hidden": true
            }
        });
        let output = project(&body, &["properties.sku.name", "properties.provisioningState", "id"]);
        assert_eq!(
            output,
            json!({
                "id": "/x",
                "properties": {"provisioningState": "Succeeded", "sku": {"name": "S1"}}
            })
        );
    }

    #[test]
    fn test_later_path_overrides_leaf() {
        let body = json!({"a": {"b": {"c": 1, "d": 2}}});
        // `a.b` then `a.b.c`: the second is an object along the way, so both survive
        assert_eq!(
            project(&body, &["a.b", "a.b.c"]),
            json!({"a": {"b": {"c": 1, "d": 2}}})
        );
    }

    #[test]
    fn test_folding_across_bodies() {
        let mut acc = project(&json!({"x": {"y": 1}}), &["x"]);
        merge_into(&mut acc, project(&json!({"x": {"z": 2}}), &["x"]));
        assert_eq!(acc, json!({"x": {"y": 1, "z": 2}}));
    }

    #[test]
    fn test_serialization_is_stable() {
        let body = json!({"b": 2, "a": {"z": 1, "y": [1, 2]}});
        let paths = ["a", "b"];
        assert_eq!(project_to_string(&body, &paths), project_to_string(&body, &paths));
    }
}

//! JSON merging used to fold export path results together.

use serde_json::Value;

/// Merge `overlay` into `base` in place.
///
/// Objects are merged key by key; for anything else the overlay replaces
/// the base value.
pub fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Deep union of two values, `b` winning on non-object conflicts
pub fn merge(a: &Value, b: &Value) -> Value {
    let mut merged = a.clone();
    merge_into(&mut merged, b.clone());
    merged
}

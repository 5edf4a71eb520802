//! Workflow configuration merging.

use serde_json::Value;

/// Deep-merge `overrides` onto `base`.
///
/// Mappings merge key by key, recursively. Anything else (scalars and
/// lists included) is replaced wholesale by the override.
pub fn deep_merge(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overrides) => *base = overrides.clone(),
    }
}

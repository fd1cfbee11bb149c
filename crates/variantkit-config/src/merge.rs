use serde_json::Value;

const MAX_MERGE_DEPTH: usize = 64;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("patch nesting exceeded the maximum depth of {MAX_MERGE_DEPTH}")]
    TooDeep,
}

/// Deep-merges `patch` onto `base` in place:
/// - objects are merged recursively,
/// - arrays are **concatenated**, not replaced,
/// - primitives in `patch` overwrite `base`,
/// - a `null` in `patch` overwrites with `null`,
/// - a key simply absent from `patch` leaves `base`'s value untouched
///   (JSON has no `undefined`, so "absent key" already has this effect).
pub fn deep_merge(base: &mut Value, patch: &Value) -> Result<(), MergeError> {
    deep_merge_at(base, patch, 0)
}

fn deep_merge_at(base: &mut Value, patch: &Value, depth: usize) -> Result<(), MergeError> {
    if depth > MAX_MERGE_DEPTH {
        return Err(MergeError::TooDeep);
    }

    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge_at(existing, patch_value, depth + 1)?,
                    None => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
            Ok(())
        }
        (Value::Array(base_array), Value::Array(patch_array)) => {
            base_array.extend(patch_array.iter().cloned());
            Ok(())
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
            Ok(())
        }
    }
}

/// Returns a new value equal to `deep_merge(base.clone(), patch)`.
pub fn merged(base: &Value, patch: &Value) -> Result<Value, MergeError> {
    let mut out = base.clone();
    deep_merge(&mut out, patch)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_merge_recursively() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let patch = json!({"a": {"y": 3, "z": 4}});
        let out = merged(&base, &patch).unwrap();
        assert_eq!(out, json!({"a": {"x": 1, "y": 3, "z": 4}}));
    }

    #[test]
    fn arrays_concatenate_rather_than_replace() {
        let base = json!({"tags": [1, 2]});
        let patch = json!({"tags": [3]});
        let out = merged(&base, &patch).unwrap();
        assert_eq!(out, json!({"tags": [1, 2, 3]}));
    }

    #[test]
    fn null_overwrites_with_null() {
        let base = json!({"a": 1});
        let patch = json!({"a": null});
        let out = merged(&base, &patch).unwrap();
        assert_eq!(out, json!({"a": null}));
    }

    #[test]
    fn missing_keys_leave_existing_values() {
        let base = json!({"a": 1, "b": 2});
        let patch = json!({"a": 9});
        let out = merged(&base, &patch).unwrap();
        assert_eq!(out, json!({"a": 9, "b": 2}));
    }

    #[test]
    fn empty_patch_is_a_no_op() {
        let base = json!({"a": 1, "b": [1, 2]});
        let out = merged(&base, &json!({})).unwrap();
        assert_eq!(out, base);
    }
}

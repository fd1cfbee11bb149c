use serde_json::Value;

const MAX_EQUALITY_DEPTH: usize = 64;

/// Deep structural equality over JSON values: `NaN == NaN`, `+0 == -0`,
/// composite types compared recursively, sequences compared elementwise by
/// length.
///
/// Fails closed (returns `false`) past [`MAX_EQUALITY_DEPTH`] rather than
/// overflowing the stack on adversarially deep input. `serde_json::Value`
/// cannot encode an actual cycle, so a depth guard is the realization of
/// "fail closed rather than diverge" for the representable case.
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    deep_equal_at(a, b, 0)
}

fn deep_equal_at(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_EQUALITY_DEPTH {
        return false;
    }

    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| deep_equal_at(x, y, depth + 1))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| deep_equal_at(v, bv, depth + 1)))
        }
        _ => false,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()) || (a == 0.0 && b == 0.0),
        _ => a == b,
    }
}

/// Elementwise array comparison with an explicit loose-length mode: strict
/// length by default, with a parameterized loose mode available to callers.
#[must_use]
pub fn deep_equal_sequences(a: &[Value], b: &[Value], strict_length: bool) -> bool {
    if strict_length && a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).all(|(x, y)| deep_equal(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_equal_matches_structurally_identical_values() {
        assert!(deep_equal(&json!({"a": [1, 2, {"b": true}]}), &json!({"a": [1, 2, {"b": true}]})));
        assert!(!deep_equal(&json!({"a": 1}), &json!({"a": 2})));
        assert!(!deep_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn zero_variants_are_equal() {
        assert!(deep_equal(&json!(0.0), &json!(-0.0)));
    }

    #[test]
    fn loose_length_mode_compares_only_the_shorter_prefix() {
        let a = vec![json!(1), json!(2)];
        let b = vec![json!(1), json!(2), json!(3)];
        assert!(!deep_equal_sequences(&a, &b, true));
        assert!(deep_equal_sequences(&a, &b, false));
    }
}

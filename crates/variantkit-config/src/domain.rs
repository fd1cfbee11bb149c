use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

/// A build-time define value: a JSON-compatible scalar, array, or object.
///
/// Realized as `serde_json::Value` rather than a hand-rolled enum so that the
/// deep-merge and deep-equality machinery in [`crate::store`] can operate on
/// it (and on whole [`Configuration`] trees) uniformly.
pub type Value = serde_json::Value;

/// Per-variant settings. The lifecycle plugin owns no defines of its own;
/// every define consumed by the macro pipeline flows through here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    #[serde(default)]
    pub define: HashMap<String, Value>,
}

/// The root configuration tree held by the [`crate::store::ConfigStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub variants: HashMap<String, VariantConfig>,
}

impl Configuration {
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<&VariantConfig> {
        self.variants.get(name)
    }
}

/// JavaScript-style truthiness over a define value: `false`, `0`, `""`,
/// `null`, and "missing" are all falsy.
#[must_use]
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

//! Stable configuration serialization for fingerprinting.
//!
//! Compiler configurations are arbitrarily nested trees. To fingerprint them
//! we need a serialization that is deterministic across runs and property
//! insertion orders. This module provides [`ConfigValue`], a configuration
//! tree type, and [`stable_string`], which renders it into a stable hash
//! preimage.
//!
//! Intentional deviations from JSON:
//! 1. Object properties are sorted before serializing.
//! 2. The output is NOT valid JSON: strings are emitted verbatim without
//!    quoting or escaping, so the string `{"a":1}` renders the same as the
//!    object `{ a: 1 }`. That aliasing is harmless for a hash preimage but
//!    rules out using the output for general serialization.
//! 3. Booleans render as the compact tokens `!0` / `!1`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// A configuration tree as seen by the fingerprint builder.
///
/// The cache treats configurations as opaque beyond serialization, so this is
/// the only shape it needs: JSON-like values plus [`Absent`] (a property or
/// element that should not contribute to the fingerprint) and [`Custom`]
/// (a value that converts itself before serialization).
///
/// [`Absent`]: ConfigValue::Absent
/// [`Custom`]: ConfigValue::Custom
#[derive(Debug, Clone)]
pub enum ConfigValue {
    /// A missing value. Omitted from objects, a `null` placeholder in arrays.
    Absent,
    /// An explicit null.
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<ConfigValue>),
    /// Insertion-ordered properties; serialization sorts them.
    Object(IndexMap<String, ConfigValue>),
    /// A value with a custom serialization hook, converted before rendering.
    Custom(Arc<dyn ToConfigValue>),
}

/// Conversion hook for values that serialize through an intermediate form
/// (for example a set-like collection rendered as a sorted list).
///
/// Applied before any other serialization rule, recursively: a hook may
/// return another [`ConfigValue::Custom`].
pub trait ToConfigValue: Send + Sync + fmt::Debug {
    fn to_config_value(&self) -> ConfigValue;
}

/// Render a configuration tree into its stable preimage string.
///
/// A top-level [`ConfigValue::Absent`] renders as the empty string.
pub fn stable_string(value: &ConfigValue) -> String {
    let mut out = String::new();
    write_value(value, false, &mut out);
    out
}

/// Serialize one value into `out`. Returns false when the value is absent in
/// a non-array position and therefore contributed nothing.
fn write_value(value: &ConfigValue, in_array: bool, out: &mut String) -> bool {
    match value {
        ConfigValue::Bool(true) => out.push_str("!0"),
        ConfigValue::Bool(false) => out.push_str("!1"),
        ConfigValue::Null => out.push_str("null"),
        ConfigValue::Absent => {
            // Array positions must be preserved, so an absent element
            // degrades to a null placeholder instead of vanishing.
            if !in_array {
                return false;
            }
            out.push_str("null");
        }
        ConfigValue::Custom(hook) => return write_value(&hook.to_config_value(), in_array, out),
        ConfigValue::Text(text) => out.push_str(text),
        ConfigValue::Number(number) => {
            if number.is_finite() {
                out.push_str(&number.to_string());
            } else {
                out.push_str("null");
            }
        }
        ConfigValue::List(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(item, true, out);
            }
            out.push(']');
        }
        ConfigValue::Object(props) => {
            let mut entries: Vec<(&String, &ConfigValue)> = props.iter().collect();
            entries.sort_unstable_by_key(|(key, _)| key.as_str());

            out.push('{');
            let mut first = true;
            for (key, prop) in entries {
                if is_omitted(prop) {
                    continue;
                }
                if !first {
                    out.push(',');
                }
                first = false;
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                write_value(prop, false, out);
            }
            out.push('}');
        }
    }
    true
}

/// True when the value serializes to nothing in object position.
fn is_omitted(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Absent => true,
        ConfigValue::Custom(hook) => is_omitted(&hook.to_config_value()),
        _ => false,
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Number(value as f64)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Number(f64::from(value))
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(value: Vec<ConfigValue>) -> Self {
        ConfigValue::List(value)
    }
}

impl From<IndexMap<String, ConfigValue>> for ConfigValue {
    fn from(value: IndexMap<String, ConfigValue>) -> Self {
        ConfigValue::Object(value)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => ConfigValue::Absent,
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigValue::Null,
            serde_json::Value::Bool(flag) => ConfigValue::Bool(flag),
            serde_json::Value::Number(number) => {
                ConfigValue::Number(number.as_f64().unwrap_or(f64::NAN))
            }
            serde_json::Value::String(text) => ConfigValue::Text(text),
            serde_json::Value::Array(items) => {
                ConfigValue::List(items.into_iter().map(ConfigValue::from).collect())
            }
            serde_json::Value::Object(props) => ConfigValue::Object(
                props
                    .into_iter()
                    .map(|(key, prop)| (key, ConfigValue::from(prop)))
                    .collect(),
            ),
        }
    }
}

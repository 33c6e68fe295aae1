//! # Field Values
//!
//! A kind's spec flattened to patch paths. Typed specs convert into a
//! [`FieldMap`] once; diffing, patch generation and the remote adapters all
//! work over this shape.

use schemars::{JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single field
///
/// Untagged so `lastApplied` reads naturally in status: booleans stay
/// booleans, integers stay integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl JsonSchema for FieldValue {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("FieldValue")
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        // Untagged values have no structural schema; let the API server keep them as-is
        schemars::json_schema!({
            "x-kubernetes-preserve-unknown-fields": true
        })
    }
}

impl FieldValue {
    /// Render the value the way API Gateway patch operations expect it
    pub fn to_patch_value(&self) -> Option<String> {
        match self {
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::List(_) | FieldValue::Map(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            FieldValue::List(values) => values,
            _ => &[],
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Compare two values the way the remote API does: list order is not
    /// significant and a scalar text value equals its parsed bool/int form.
    pub fn equivalent(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::List(a), FieldValue::List(b)) => {
                let mut a = a.clone();
                let mut b = b.clone();
                a.sort();
                b.sort();
                a.dedup();
                b.dedup();
                a == b
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => a == b,
            (a, b) => a.to_patch_value().is_some() && a.to_patch_value() == b.to_patch_value(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::List(values) => write!(f, "[{}]", values.join(", ")),
            FieldValue::Map(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            other => f.write_str(&other.to_patch_value().unwrap_or_default()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<BTreeMap<String, String>> for FieldValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        FieldValue::Map(value)
    }
}

/// Patch path → value
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Identifier name (`restApiId`, `httpMethod`, ...) → value
pub type Identifiers = BTreeMap<String, String>;

/// Insert `value` under `path` when present.
pub fn put<V: Into<FieldValue>>(fields: &mut FieldMap, path: &str, value: Option<V>) {
    if let Some(value) = value {
        fields.insert(path.to_string(), value.into());
    }
}

/// Convert a boolean-valued map to the string form the remote API patches with.
pub fn bool_map(map: &BTreeMap<String, bool>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()
}

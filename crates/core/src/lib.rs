//! Kindling core: the host attribute tree and the generic value it decodes into.
//!
//! The host engine hands us a weakly typed tree where every node may be null or
//! not yet known. [`decode`] flattens that tree into [`Value`], a plain nested
//! structure the normalizer can pattern-match without knowing anything about
//! how the host represents values.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod decode;

pub use decode::{decode, decode_object};

/// String-keyed generic mapping produced for host maps and objects.
pub type Map = BTreeMap<String, Value>;

/// Generic, self-describing value. `Null` stands for both null and unknown input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::String(s) => Some(s), _ => None }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { Value::Bool(b) => Some(*b), _ => None }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self { Value::Int(i) => Some(*i), _ => None }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self { Value::List(l) => Some(l), _ => None }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self { Value::Map(m) => Some(m), _ => None }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}

/// A node of the host engine's attribute tree.
///
/// Every node can independently be `Null` (explicitly unset) or `Unknown`
/// (not resolved yet at plan time). `Number` carries an arbitrary precision
/// decimal in text form. `Unsupported` stands in for any host type this crate
/// does not model; it decodes to [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Unknown,
    String(String),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Number(String),
    List(Vec<AttrValue>),
    Set(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
    Object(BTreeMap<String, AttrValue>),
    Unsupported(String),
}

impl AttrValue {
    pub fn string(s: impl Into<String>) -> Self { AttrValue::String(s.into()) }

    /// Build an object node from `(key, value)` pairs.
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, AttrValue)>) -> Self {
        AttrValue::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a map node from `(key, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, AttrValue)>) -> Self {
        AttrValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null_or_unknown(&self) -> bool {
        matches!(self, AttrValue::Null | AttrValue::Unknown)
    }

    /// Adapt a plain JSON document into an attribute tree.
    ///
    /// Integers that fit `i64` become `Int64`; larger integers keep their
    /// decimal text as `Number`; everything else numeric becomes `Float64`.
    /// JSON objects map to `Object` since plain JSON cannot tell maps and
    /// objects apart.
    pub fn from_json(v: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Null => AttrValue::Null,
            J::Bool(b) => AttrValue::Bool(b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttrValue::Int64(i)
                } else if n.is_u64() {
                    AttrValue::Number(n.to_string())
                } else {
                    n.as_f64().map(AttrValue::Float64).unwrap_or_else(|| AttrValue::Number(n.to_string()))
                }
            }
            J::String(s) => AttrValue::String(s),
            J::Array(items) => AttrValue::List(items.into_iter().map(AttrValue::from_json).collect()),
            J::Object(fields) => AttrValue::Object(fields.into_iter().map(|(k, v)| (k, AttrValue::from_json(v))).collect()),
        }
    }
}

pub mod prelude {
    pub use super::{decode, decode_object, AttrValue, Map, Value};
}

//! Total, defaulting getters over a decoded [`Map`].
//!
//! None of these fail. A missing key, a `Null` value and a value of the wrong
//! dynamic type all produce the zero value for the requested type. Collection
//! getters return `None` in those cases and silently skip elements of the
//! wrong type.

use std::collections::BTreeMap;

use kindling_core::{Map, Value};

fn lookup<'a>(m: &'a Map, key: &str) -> Option<&'a Value> {
    m.get(key).filter(|v| !v.is_null())
}

pub fn get_string(m: &Map, key: &str) -> String {
    lookup(m, key).and_then(Value::as_str).map(str::to_string).unwrap_or_default()
}

/// Non-empty string or `None`.
pub fn get_opt_string(m: &Map, key: &str) -> Option<String> {
    Some(get_string(m, key)).filter(|s| !s.is_empty())
}

/// Integer value; floats are not coerced.
pub fn get_int(m: &Map, key: &str) -> i64 {
    lookup(m, key).and_then(Value::as_int).unwrap_or(0)
}

pub fn get_bool(m: &Map, key: &str) -> bool {
    lookup(m, key).and_then(Value::as_bool).unwrap_or(false)
}

pub fn get_string_slice(m: &Map, key: &str) -> Option<Vec<String>> {
    let items = lookup(m, key)?.as_list()?;
    Some(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

pub fn get_map_slice<'a>(m: &'a Map, key: &str) -> Option<Vec<&'a Map>> {
    let items = lookup(m, key)?.as_list()?;
    Some(items.iter().filter_map(Value::as_map).collect())
}

pub fn get_map<'a>(m: &'a Map, key: &str) -> Option<&'a Map> {
    lookup(m, key)?.as_map()
}

pub fn get_string_map(m: &Map, key: &str) -> Option<BTreeMap<String, String>> {
    let src = lookup(m, key)?.as_map()?;
    Some(src.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect())
}

/// A nested block given either as a single map or as a list of maps (first wins).
pub fn get_block<'a>(m: &'a Map, key: &str) -> Option<&'a Map> {
    match lookup(m, key)? {
        Value::Map(block) => Some(block),
        Value::List(items) => items.iter().find_map(Value::as_map),
        _ => None,
    }
}

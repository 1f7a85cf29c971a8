use crate::{AttrValue, Map, Value};

/// Convert a host attribute node into a generic [`Value`].
///
/// Total and side-effect free: null, unknown and unsupported nodes all become
/// [`Value::Null`]; collections recurse element-wise, so a null element inside
/// a list stays in place as `Null`.
pub fn decode(v: &AttrValue) -> Value {
    match v {
        AttrValue::Null | AttrValue::Unknown | AttrValue::Unsupported(_) => Value::Null,
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Int64(i) => Value::Int(*i),
        AttrValue::Float64(f) => Value::Float(*f),
        // Arbitrary precision degrades to the nearest f64.
        AttrValue::Number(text) => text.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        AttrValue::List(items) | AttrValue::Set(items) => Value::List(items.iter().map(decode).collect()),
        AttrValue::Map(entries) | AttrValue::Object(entries) => Value::Map(decode_entries(entries)),
    }
}

/// Decode an object or map node into a generic mapping.
/// Returns `None` for null/unknown nodes and for anything that is not keyed.
pub fn decode_object(v: &AttrValue) -> Option<Map> {
    match v {
        AttrValue::Map(entries) | AttrValue::Object(entries) => Some(decode_entries(entries)),
        _ => None,
    }
}

fn decode_entries(entries: &std::collections::BTreeMap<String, AttrValue>) -> Map {
    entries.iter().map(|(k, v)| (k.clone(), decode(v))).collect()
}

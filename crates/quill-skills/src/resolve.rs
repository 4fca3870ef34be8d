use serde_json::{Map, Value};

use crate::context::StepResults;

/// Marker that turns a string value into a reference.
pub const REFERENCE_MARKER: char = '$';

/// Resolve a literal or `$name` reference.
///
/// References are looked up in `input` first, then in `prior`. An
/// unresolvable reference comes back as the original string.
pub fn resolve(value: &Value, input: &Map<String, Value>, prior: &StepResults) -> Value {
    match reference_name(value) {
        Some(name) => input
            .get(name)
            .or_else(|| prior.get(name))
            .cloned()
            .unwrap_or_else(|| value.clone()),
        None => value.clone(),
    }
}

/// Resolve every entry of a parameter map.
pub fn resolve_map(
    mapping: &Map<String, Value>,
    input: &Map<String, Value>,
    prior: &StepResults,
) -> Map<String, Value> {
    mapping
        .iter()
        .map(|(key, value)| (key.clone(), resolve(value, input, prior)))
        .collect()
}

/// The referenced name when `value` is a `$name` string.
pub fn reference_name(value: &Value) -> Option<&str> {
    value.as_str()?.strip_prefix(REFERENCE_MARKER)
}

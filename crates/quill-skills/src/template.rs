//! Flat `{{key}}` substitution.
//!
//! Placeholders are `{{` + ASCII word characters + `}}`. A key present in the
//! data map is replaced by the value's string form; a missing key leaves the
//! placeholder untouched. Nothing is evaluated, so templates from imported
//! skill documents are safe to fill.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("Invalid regex"));

/// Fill every placeholder in `template` from `data`.
pub fn fill(template: &str, data: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match data.get(&caps[1]) {
            Some(value) => string_form(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Text rendering of a value as it appears inside filled templates.
///
/// Strings are raw, integral floats drop their fraction, arrays join their
/// elements with `,` (null elements render empty) and objects are compact
/// JSON.
pub fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => string_form(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data must be an object"),
        }
    }

    #[test]
    fn substitutes_every_occurrence() {
        let out = fill("{{a}} and {{a}} then {{b}}", &data(json!({ "a": "x", "b": 2 })));
        assert_eq!(out, "x and x then 2");
    }

    #[test]
    fn missing_keys_stay_verbatim() {
        let out = fill("Hello {{name}}, {{missing}}!", &data(json!({ "name": "Ada" })));
        assert_eq!(out, "Hello Ada, {{missing}}!");
    }

    #[test]
    fn present_null_is_substituted() {
        assert_eq!(fill("[{{v}}]", &data(json!({ "v": null }))), "[null]");
    }

    #[test]
    fn non_word_placeholders_are_ignored() {
        let d = data(json!({ "a.b": 1, "a b": 2 }));
        assert_eq!(fill("{{a.b}} {{a b}} {{ a }}", &d), "{{a.b}} {{a b}} {{ a }}");
    }

    #[test]
    fn non_ascii_identifiers_do_not_match() {
        let d = data(json!({ "主题": "x" }));
        assert_eq!(fill("{{主题}}", &d), "{{主题}}");
    }

    #[test]
    fn values_render_with_string_form() {
        let d = data(json!({
            "arr": ["a", 1, null, true],
            "obj": { "k": "v" },
            "float": 2.0,
            "frac": 0.5
        }));
        assert_eq!(fill("{{arr}}", &d), "a,1,,true");
        assert_eq!(fill("{{obj}}", &d), r#"{"k":"v"}"#);
        assert_eq!(fill("{{float}} {{frac}}", &d), "2 0.5");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let d = data(json!({ "a": "{{b}}", "b": "boom" }));
        assert_eq!(fill("{{a}}", &d), "{{b}}");
    }

    #[test]
    fn placeholders_are_deduplicated_in_order() {
        assert_eq!(placeholders("{{b}} {{a}} {{b}}"), vec!["b", "a"]);
    }
}

//! Helpers for payloads whose nesting varies between responses.
//!
//! Upstreams return the same logical field as a bare value, a single
//! object, or an array of objects. Everything is routed through
//! [`coerce_list`] so the per-provider parsers never branch on shape.

use serde_json::Value;

/// Normalise a node to a list, dropping null and empty entries.
pub fn coerce_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| !is_blank(v)).collect(),
        other if is_blank(other) => vec![],
        other => vec![other],
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Extract text from a node, descending through the first matching key.
///
/// Strings and numbers are returned directly; objects are searched for
/// `keys` in order; arrays yield their first textual element.
pub fn text_of(value: &Value, keys: &[&str]) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => keys
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| text_of(v, keys))),
        Value::Array(items) => items.iter().find_map(|v| text_of(v, keys)),
        _ => None,
    }
}

/// [`coerce_list`] followed by [`text_of`] on every entry.
pub fn coerce_strings(value: &Value, keys: &[&str]) -> Vec<String> {
    coerce_list(value)
        .into_iter()
        .filter_map(|v| text_of(v, keys))
        .collect()
}

/// First non-empty string among several alternative keys of one object.
pub fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text_of(&item[*k], &["$", "text", "value"]))
}

/// Pick the entry whose `@lang` is English, else the first.
pub fn prefer_english<'a>(items: &[&'a Value]) -> Option<&'a Value> {
    items
        .iter()
        .find(|v| v["@lang"].as_str().is_some_and(|l| l.eq_ignore_ascii_case("en")))
        .or_else(|| items.first())
        .copied()
}

/// Trimmed, upper-cased country code with a provider default.
pub fn jurisdiction(raw: Option<String>, default: &str) -> String {
    raw.map(|j| j.trim().to_uppercase())
        .filter(|j| !j.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Collapse internal runs of whitespace (classification symbols are padded).
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! `{argument}` placeholder interpolation for REST call templates.
//!
//! Three flavors, one per template slot:
//! - path: placeholders become the percent-encoded string form of the argument (or nothing)
//! - query: like path, but `key={arg}` assignments whose argument is absent are dropped entirely
//! - body: placeholders become the argument's JSON text (or `null`)

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^&?]*?)=\{([^}]+)\}").expect("assignment pattern is valid"));

static AMPERSANDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&+").expect("ampersand pattern is valid"));

/// Interpolate a path template.
#[must_use]
pub fn interpolate_path(template: &str, arguments: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            arguments
                .get(&caps[1])
                .map(|v| escape_data(&value_to_string(v)))
                .unwrap_or_default()
        })
        .into_owned()
}

/// Interpolate a query template.
///
/// `"a={x}&b={y}"` with only `x = "1"` yields `"a=1"`.
#[must_use]
pub fn interpolate_query(template: &str, arguments: &Map<String, Value>) -> String {
    let present = ASSIGNMENT.replace_all(template, |caps: &Captures<'_>| {
        if arguments.contains_key(&caps[2]) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let interpolated = interpolate_path(&present, arguments);
    AMPERSANDS
        .replace_all(&interpolated, "&")
        .trim_matches('&')
        .to_string()
}

/// Interpolate a body template. Strings stay quoted, numbers/objects/arrays are inlined as-is.
#[must_use]
pub fn interpolate_body(template: &str, arguments: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            arguments
                .get(&caps[1])
                .map_or_else(|| "null".to_string(), Value::to_string)
        })
        .into_owned()
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
#[must_use]
pub fn escape_data(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn path_placeholders_are_escaped() {
        let a = args(json!({"id": "a b/c", "n": 42}));
        assert_eq!(
            interpolate_path("/users/{id}/items/{n}", &a),
            "/users/a%20b%2Fc/items/42"
        );
    }

    #[test]
    fn absent_path_argument_becomes_empty() {
        assert_eq!(interpolate_path("/users/{id}", &Map::new()), "/users/");
    }

    #[test]
    fn query_drops_absent_assignments() {
        let a = args(json!({"x": "1"}));
        assert_eq!(interpolate_query("a={x}&b={y}", &a), "a=1");
        assert_eq!(interpolate_query("b={y}&a={x}", &a), "a=1");
        assert_eq!(interpolate_query("b={y}&a={x}&c={z}", &a), "a=1");
    }

    #[test]
    fn query_with_no_arguments_is_empty() {
        assert_eq!(interpolate_query("from={from}&to={to}", &Map::new()), "");
    }

    #[test]
    fn query_keeps_literal_terms_and_escapes_values() {
        let a = args(json!({"q": "rust & go", "limit": 10}));
        assert_eq!(
            interpolate_query("format=json&q={q}&&limit={limit}&page={page}", &a),
            "format=json&q=rust%20%26%20go&limit=10"
        );
    }

    #[test]
    fn booleans_and_null_render_in_lowercase_json_form() {
        let a = args(json!({"active": true, "archived": false, "owner": null}));
        assert_eq!(
            interpolate_path("/flags/{active}/{archived}", &a),
            "/flags/true/false"
        );
        assert_eq!(
            interpolate_query("active={active}&archived={archived}&owner={owner}", &a),
            "active=true&archived=false&owner="
        );
    }

    #[test]
    fn body_preserves_json_types() {
        let a = args(json!({
            "name": "Ada",
            "age": 36,
            "tags": ["x", "y"],
            "meta": {"admin": true}
        }));
        let body = interpolate_body(
            r#"{"name": {name}, "age": {age}, "tags": {tags}, "meta": {meta}, "team": {team}}"#,
            &a,
        );
        let parsed: Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(
            parsed,
            json!({
                "name": "Ada",
                "age": 36,
                "tags": ["x", "y"],
                "meta": {"admin": true},
                "team": null
            })
        );
    }

    #[test]
    fn whole_body_placeholder_inlines_argument() {
        let a = args(json!({"requestBody": {"title": "hi"}}));
        assert_eq!(interpolate_body("{requestBody}", &a), r#"{"title":"hi"}"#);
        assert_eq!(interpolate_body("{requestBody}", &Map::new()), "null");
    }
}

//! Placeholder substitution
//!
//! Substitution is literal text replacement, not templating. Tokens appear
//! as `{name}` for values propagated from responses, or as `<description>`
//! / `[...]` forms taken verbatim from the sample source.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Ordered mapping from placeholder token to replacement text
///
/// Inserting an existing token replaces its value, so building a set in
/// increasing precedence order leaves the highest precedence value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionSet {
    entries: IndexMap<String, String>,
}

impl SubstitutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token used verbatim
    pub fn insert_token(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(token.into(), value.into());
    }

    /// Insert a response attribute; see [`token_for`]
    pub fn insert_attribute(&mut self, name: &str, value: &Value) {
        self.entries.insert(token_for(name), render_value(value));
    }

    /// Insert every attribute of a response body object
    pub fn extend_attributes(&mut self, body: &Map<String, Value>) {
        for (name, value) in body {
            self.insert_attribute(name, value);
        }
    }

    /// Merge `other` into this set; `other` wins on conflicts
    pub fn merge(&mut self, other: SubstitutionSet) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every token occurrence in `text`, in insertion order
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (token, value) in &self.entries {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), value);
            }
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubstitutionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (token, value) in iter {
            set.insert_token(token, value);
        }
        set
    }
}

/// Placeholder token for an attribute name
///
/// Names already written in bracket form (`<...>`, `[...]`) are used as is;
/// anything else becomes `{name}`.
pub fn token_for(name: &str) -> String {
    if name.starts_with('<') || name.starts_with('[') {
        name.to_string()
    } else {
        format!("{{{}}}", name)
    }
}

/// Replacement text for a JSON value: raw text for strings, JSON otherwise
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => to_spaced_json(other),
    }
}

/// JSON with `", "` and `": "` separators, the way API docs write it
pub fn to_spaced_json(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_spaced_json).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), to_spaced_json(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        other => other.to_string(),
    }
}

// Quoted placeholders inside a JSON payload. Shell samples carry the
// payload in a double-quoted string, so their quotes are backslash-escaped.
static ESCAPED_SCALAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\"(\w+?)\\": ?\\"<(.+?)>\\""#).expect("valid regex"));
static ESCAPED_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\"(\w+?)\\": ?(\[.+?\])"#).expect("valid regex"));
static NATIVE_SCALAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\w+?)": ?"<(.+?)>""#).expect("valid regex"));
static NATIVE_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\w+?)": ?(\[.+?\])"#).expect("valid regex"));

/// Substitutions from companion example values for placeholders found in
/// a sample's source
///
/// Two shapes are recognised, each in escaped and plain quoting:
/// `"name": "<description>"` replaces `<description>` with the example, and
/// `"name": [...]` replaces the literal array with the example array as
/// JSON (quote-escaped for the escaped form).
pub fn example_substitutions(source: &str, examples: &IndexMap<String, Value>) -> SubstitutionSet {
    let mut subs = SubstitutionSet::new();
    if examples.is_empty() {
        return subs;
    }

    for (regex, escaped) in [(&*ESCAPED_SCALAR, true), (&*NATIVE_SCALAR, false)] {
        for caps in regex.captures_iter(source) {
            if let Some(example) = examples.get(&caps[1]) {
                let value = render_value(example);
                let value = if escaped { value.replace('"', "\\\"") } else { value };
                subs.insert_token(format!("<{}>", &caps[2]), value);
            }
        }
    }

    for (regex, escaped) in [(&*ESCAPED_ARRAY, true), (&*NATIVE_ARRAY, false)] {
        for caps in regex.captures_iter(source) {
            if let Some(example) = examples.get(&caps[1]) {
                let json = to_spaced_json(example);
                let value = if escaped { json.replace('"', "\\\"") } else { json };
                subs.insert_token(&caps[2], value);
            }
        }
    }

    subs
}

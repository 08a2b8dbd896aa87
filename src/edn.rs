//! EDN companion files
//!
//! API docs keep a `debug.edn` next to each sample describing request
//! parameters. An entry such as
//!
//! ```text
//! :productName {:type "string", :description "Product", :example "Whiskey"}
//! ```
//!
//! provides the example value `productName = "Whiskey"` that is substituted
//! into the sample before it runs.

use edn_format::{Keyword, Value as Edn};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;

use crate::common::{Error, Result};
use crate::runner::pyliteral;

/// Value used for documented parameters that carry no example
pub const STUB_VALUE: &str = "STUB";

/// Parse a single EDN document
pub fn parse(input: &str) -> std::result::Result<Edn, String> {
    edn_format::parse_str(input).map_err(|e| format!("{:?}", e))
}

/// Look up a keyword key (without the leading colon) in a map
fn get<'a>(node: &'a Edn, keyword: &str) -> Option<&'a Edn> {
    match node {
        Edn::Map(entries) => entries.get(&Edn::Keyword(Keyword::from_name(keyword))),
        _ => None,
    }
}

/// Name of a keyword or symbol without its namespace, or string content
fn key_name(key: &Edn) -> Option<&str> {
    match key {
        Edn::Keyword(keyword) => Some(keyword.name()),
        Edn::Symbol(symbol) => Some(symbol.name()),
        Edn::String(s) => Some(s),
        _ => None,
    }
}

fn is_truthy(value: &Edn) -> bool {
    match value {
        Edn::Nil | Edn::Boolean(false) => false,
        Edn::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Example text as it appears in the sample: string content unquoted,
/// anything else in EDN notation
fn example_text(example: &Edn) -> String {
    match example {
        Edn::String(s) => s.clone(),
        other => edn_format::emit_str(other),
    }
}

/// Collect example values for documented parameters
///
/// A map entry whose value has `:type` and `:example` yields the example;
/// `:type` with `:description` but no example yields [`STUB_VALUE`]; other
/// maps are searched recursively. A trailing `?` in a parameter name is
/// dropped. Array examples are decoded into JSON values.
pub fn example_values(doc: &Edn) -> IndexMap<String, Value> {
    let mut found = IndexMap::new();
    search(doc, &mut found);
    found
}

fn search(node: &Edn, found: &mut IndexMap<String, Value>) {
    let Edn::Map(entries) = node else {
        return;
    };
    for (key, data) in entries {
        if !matches!(data, Edn::Map(_)) {
            continue;
        }
        let param_type = get(data, "type").filter(|t| is_truthy(t));
        let example = get(data, "example").filter(|e| is_truthy(e));
        let description = get(data, "description").filter(|d| is_truthy(d));

        match (param_type, example, description) {
            (Some(param_type), Some(example), _) => {
                if let Some(name) = key_name(key) {
                    found.insert(name.replace('?', ""), example_value(param_type, example));
                }
            }
            (Some(_), None, Some(_)) => {
                if let Some(name) = key_name(key) {
                    found.insert(name.replace('?', ""), Value::String(STUB_VALUE.to_string()));
                }
            }
            _ => search(data, found),
        }
    }
}

fn example_value(param_type: &Edn, example: &Edn) -> Value {
    let text = example_text(example);
    if matches!(param_type, Edn::String(t) if t == "array") {
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return value;
        }
        if let Ok(value) = pyliteral::parse(&text) {
            return value;
        }
    }
    Value::String(text)
}

/// Load example values from a companion file
///
/// A missing file yields no values.
pub fn load_examples(path: &Path) -> Result<IndexMap<String, Value>> {
    if !path.exists() {
        return Ok(IndexMap::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let doc = parse(&content).map_err(|e| Error::ConfigParse {
        path: path.display().to_string(),
        message: e,
    })?;
    Ok(example_values(&doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_param_load() {
        let doc = parse(
            r#"{
    :apiVersion "v1",
    :productName {:type "string", :description "Product", :example "Whiskey"}
    }"#,
        )
        .unwrap();
        let examples = example_values(&doc);
        assert_eq!(examples.len(), 1);
        assert_eq!(examples["productName"], json!("Whiskey"));
    }

    #[test]
    fn test_array_param_load() {
        let doc = parse(
            r#"{
    :apiVersion "v1",
    :keys
      {
        :type "array",
        :example "[{\"key\": \"rsa\"}]",
        :description "Test"}
    }"#,
        )
        .unwrap();
        assert_eq!(example_values(&doc)["keys"], json!([{"key": "rsa"}]));
    }

    #[test]
    fn test_nested_stub_and_optional_names() {
        let doc = parse(
            r#"{:request {:body {:name? {:type "string" :description "Name"}
                                 :count {:type "integer" :example 3}}}
                ; comment
                :tags #{:a :b}
                :version #myapp/version "1.0"}"#,
        )
        .unwrap();
        let examples = example_values(&doc);
        assert_eq!(examples["name"], json!(STUB_VALUE));
        assert_eq!(examples["count"], json!("3"));
    }

    #[test]
    fn test_discarded_form_before_closing_brace() {
        let doc = parse(r#"{:name {:type "string" :example "Whiskey" #_ :old}}"#).unwrap();
        assert_eq!(example_values(&doc)["name"], json!("Whiskey"));
    }

    #[test]
    fn test_reader_errors() {
        assert!(parse("{:a}").is_err());
        assert!(parse("{:a 1").is_err());
        assert!(parse("\"open").is_err());
    }

    #[test]
    fn test_missing_file_has_no_examples() {
        let dir = tempfile::tempdir().unwrap();
        let examples = load_examples(&dir.path().join("debug.edn")).unwrap();
        assert!(examples.is_empty());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.edn");
        std::fs::write(&path, "{:a").unwrap();
        assert!(matches!(load_examples(&path), Err(Error::ConfigParse { .. })));
    }
}

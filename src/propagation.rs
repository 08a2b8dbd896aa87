//! Result propagation map
//!
//! Every outcome is stored at its resource path. Descendant samples pick up
//! the response attributes of ancestor POST outcomes as substitutions, so an
//! id returned by `users POST` fills `{id}` in `users/{id} GET`.

use serde_json::{Map, Value};
use tracing::warn;

use crate::runner::{ExecutionOutcome, SubstitutionSet};
use crate::sample::{HttpMethod, Sample};
use crate::tree::ResourceNode;

/// Outcomes of executed samples keyed by resource path and method
///
/// One map is shared by all languages of a session; a later language
/// overwrites the slot of an earlier one.
#[derive(Debug, Default)]
pub struct ResultMap {
    root: ResourceNode<ExecutionOutcome>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an outcome
    ///
    /// Each `(old, new)` rename copies attribute `old` of the body to `new`,
    /// keeping the original. `extra` attributes (from a prerequisite) are
    /// merged in afterwards so descendants see them too.
    pub fn put(&mut self, mut outcome: ExecutionOutcome, renames: &[(String, String)], extra: &Map<String, Value>) {
        if let Some(Value::Object(body)) = outcome.body.as_mut() {
            for (old, new) in renames {
                if let Some(value) = body.get(old).cloned() {
                    body.insert(new.clone(), value);
                }
            }
        }

        if !extra.is_empty() {
            match outcome.body.as_mut() {
                Some(Value::Object(body)) => {
                    body.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                None | Some(Value::Null) => outcome.body = Some(Value::Object(extra.clone())),
                Some(_) => warn!(
                    sample = %outcome.sample,
                    attributes = ?extra.keys().collect::<Vec<_>>(),
                    "Response body is not an object, prerequisite attributes are not propagated"
                ),
            }
        }

        let segments: Vec<String> = outcome.sample.segments().map(str::to_string).collect();
        let method = outcome.sample.method;
        self.root
            .insert(segments.iter().map(String::as_str), method, outcome);
    }

    /// Stored outcome for a resource path and method
    pub fn get(&self, path: &str, method: HttpMethod) -> Option<&ExecutionOutcome> {
        let mut node = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment)?;
        }
        node.method(method)
    }

    /// Substitutions from the POST outcomes of the sample's ancestors
    ///
    /// Attributes of deeper ancestors override shallower ones. Failed
    /// outcomes contribute whatever body they carry.
    pub fn ancestor_substitutions(&self, sample: &Sample) -> SubstitutionSet {
        let mut subs = SubstitutionSet::new();
        for node in self.root.ancestors(sample.segments()) {
            if let Some(Value::Object(body)) = node.method(HttpMethod::Post).and_then(|o| o.body.as_ref()) {
                subs.extend_attributes(body);
            }
        }
        subs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::tests::sample;
    use crate::sample::Language;
    use serde_json::json;
    use std::time::Duration;

    fn outcome(name: &str, method: HttpMethod, body: Option<Value>) -> ExecutionOutcome {
        ExecutionOutcome {
            sample: sample(name, method, Language::Shell),
            passed: body.is_some(),
            status: body.as_ref().map(|_| 201),
            body,
            command: None,
            reason: None,
            detail: None,
            source_code: String::new(),
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_ancestor_id_substituted() {
        let mut map = ResultMap::new();
        map.put(outcome("api/users", HttpMethod::Post, Some(json!({"id": "X"}))), &[], &Map::new());

        let child = sample("api/users/{id}", HttpMethod::Get, Language::Shell);
        let subs = map.ancestor_substitutions(&child);
        assert_eq!(
            subs.apply("curl $API/users/{id} -H 'X: {other}'"),
            "curl $API/users/X -H 'X: {other}'"
        );
    }

    #[test]
    fn test_no_ancestors_is_empty() {
        let mut map = ResultMap::new();
        map.put(outcome("api", HttpMethod::Post, Some(json!({"id": 1}))), &[], &Map::new());
        let top = sample("other", HttpMethod::Get, Language::Shell);
        assert!(map.ancestor_substitutions(&top).is_empty());

        // The sample's own node is not an ancestor
        let same = sample("api", HttpMethod::Get, Language::Shell);
        assert!(map.ancestor_substitutions(&same).is_empty());
    }

    #[test]
    fn test_failed_ancestor_without_body() {
        let mut map = ResultMap::new();
        map.put(outcome("users", HttpMethod::Post, None), &[], &Map::new());
        let child = sample("users/{id}", HttpMethod::Get, Language::Shell);
        assert!(map.ancestor_substitutions(&child).is_empty());
    }

    #[test]
    fn test_deeper_ancestor_overrides() {
        let mut map = ResultMap::new();
        map.put(outcome("a", HttpMethod::Post, Some(json!({"id": "outer", "a": 1}))), &[], &Map::new());
        map.put(outcome("a/b", HttpMethod::Post, Some(json!({"id": "inner"}))), &[], &Map::new());
        map.put(outcome("a/b", HttpMethod::Get, Some(json!({"id": "ignored"}))), &[], &Map::new());

        let subs = map.ancestor_substitutions(&sample("a/b/c", HttpMethod::Get, Language::Shell));
        assert_eq!(subs.get("{id}"), Some("inner"));
        assert_eq!(subs.get("{a}"), Some("1"));
    }

    #[test]
    fn test_renames_keep_original() {
        let mut map = ResultMap::new();
        let renames = vec![("@id".to_string(), "userId".to_string()), ("missing".to_string(), "x".to_string())];
        map.put(outcome("users", HttpMethod::Post, Some(json!({"@id": "U1"}))), &renames, &Map::new());

        let stored = map.get("users", HttpMethod::Post).unwrap();
        assert_eq!(stored.body, Some(json!({"@id": "U1", "userId": "U1"})));

        let subs = map.ancestor_substitutions(&sample("users/{userId}", HttpMethod::Get, Language::Shell));
        assert_eq!(subs.get("{userId}"), Some("U1"));
        assert_eq!(subs.get("{@id}"), Some("U1"));
    }

    #[test]
    fn test_prerequisite_attributes_reach_descendants() {
        let mut map = ResultMap::new();
        let mut extra = Map::new();
        extra.insert("<username>".to_string(), json!("John"));
        map.put(outcome("users", HttpMethod::Post, None), &[], &extra);

        let subs = map.ancestor_substitutions(&sample("users/{id}", HttpMethod::Get, Language::Shell));
        assert_eq!(subs.get("<username>"), Some("John"));
    }

    #[test]
    fn test_array_body_keeps_shape_with_prerequisite() {
        let mut map = ResultMap::new();
        let mut extra = Map::new();
        extra.insert("<username>".to_string(), json!("John"));
        map.put(outcome("users", HttpMethod::Post, Some(json!([{"id": 1}]))), &[], &extra);

        let stored = map.get("users", HttpMethod::Post).unwrap();
        assert_eq!(stored.body, Some(json!([{"id": 1}])));
    }
}

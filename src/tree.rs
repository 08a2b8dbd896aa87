//! Resource tree keyed by resource path segments
//!
//! Both the sample orderer and the result propagation map store one value
//! per HTTP method at the node of its resource path.

use indexmap::IndexMap;
use std::collections::BTreeMap;

use crate::sample::HttpMethod;

/// A node in the resource tree
#[derive(Debug)]
pub struct ResourceNode<T> {
    methods: BTreeMap<HttpMethod, T>,
    children: IndexMap<String, ResourceNode<T>>,
}

impl<T> Default for ResourceNode<T> {
    fn default() -> Self {
        Self {
            methods: BTreeMap::new(),
            children: IndexMap::new(),
        }
    }
}

impl<T> ResourceNode<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in the method slot of the node at `segments`,
    /// creating intermediate nodes as needed
    ///
    /// Returns the value previously held by that slot.
    pub fn insert<'a, I>(&mut self, segments: I, method: HttpMethod, value: T) -> Option<T>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = self;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.methods.insert(method, value)
    }

    /// Value in a method slot of this node
    pub fn method(&self, method: HttpMethod) -> Option<&T> {
        self.methods.get(&method)
    }

    pub fn child(&self, segment: &str) -> Option<&ResourceNode<T>> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ResourceNode<T>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Nodes visited on the way to `segments`, excluding this root and the
    /// target node itself
    ///
    /// Stops early at the first segment that has no node.
    pub fn ancestors<'a, I>(&self, segments: I) -> Vec<&ResourceNode<T>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let segments: Vec<&str> = segments.into_iter().collect();
        let mut found = Vec::new();
        let mut node = self;
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            match node.children.get(*segment) {
                Some(child) => {
                    found.push(child);
                    node = child;
                }
                None => break,
            }
        }
        found
    }

    /// Depth-first lifecycle traversal
    ///
    /// At every node POST, GET and PUT are visited before any child node;
    /// DELETE is visited after all descendants.
    pub fn walk_lifecycle<'s, F>(&'s self, visit: &mut F)
    where
        F: FnMut(&'s T),
    {
        for method in [HttpMethod::Post, HttpMethod::Get, HttpMethod::Put] {
            if let Some(value) = self.methods.get(&method) {
                visit(value);
            }
        }
        for child in self.children.values() {
            child.walk_lifecycle(visit);
        }
        if let Some(value) = self.methods.get(&HttpMethod::Delete) {
            visit(value);
        }
    }
}

//! Prerequisite resources
//!
//! Some samples need a resource that no other sample creates, for instance
//! an identity to act as the owner of a product. Such dependencies are
//! declared in the configuration per resource path and method; the
//! registry creates them right before the sample runs and deletes them all
//! when the session ends.

pub mod api;
mod resources;

pub use api::{HttpResourceApi, ResourceApi};
pub use resources::{PrerequisiteResource, ResourceKind};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::sample::HttpMethod;

/// A prerequisite declared in the configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrerequisiteDecl {
    /// Resource path of the sample that needs the prerequisite
    pub path: String,
    pub method: HttpMethod,
    pub resource: ResourceKind,
    /// Response attribute -> substitution name
    #[serde(default)]
    pub subs: IndexMap<String, String>,
}

/// Creates prerequisites on demand and tracks them for cleanup
pub struct ResourceRegistry {
    api: Box<dyn ResourceApi>,
    api_url: String,
    resources: Vec<PrerequisiteResource>,
}

impl ResourceRegistry {
    pub fn new(api: Box<dyn ResourceApi>, api_url: impl Into<String>) -> Self {
        Self {
            api,
            api_url: api_url.into(),
            resources: Vec::new(),
        }
    }

    /// Create the declared resource and extract the requested attributes,
    /// renamed per the declaration
    ///
    /// A failed creation is logged and yields no attributes; the sample
    /// still runs.
    pub async fn create(&mut self, decl: &PrerequisiteDecl) -> Map<String, Value> {
        let mut resource = PrerequisiteResource::new(decl.resource, &self.api_url);
        let body = match resource.create(self.api.as_ref()).await {
            Ok(body) => body,
            Err(e) => {
                warn!(resource = %decl.resource, path = %decl.path, "Failed to create prerequisite: {}", e);
                None
            }
        };
        self.resources.push(resource);

        let mut extracted = Map::new();
        if let Some(Value::Object(body)) = body {
            for (from, to) in &decl.subs {
                if let Some(value) = body.get(from) {
                    extracted.insert(to.clone(), value.clone());
                }
            }
        }
        extracted
    }

    /// Resources created so far
    pub fn resources(&self) -> &[PrerequisiteResource] {
        &self.resources
    }

    /// Delete every created resource that has not been deleted yet
    ///
    /// Failures are logged; cleanup carries on with the remaining resources.
    pub async fn cleanup(&mut self) {
        let pending = self
            .resources
            .iter()
            .filter(|r| r.created && !r.deleted)
            .count();
        if pending > 0 {
            info!(count = pending, "Cleaning up prerequisite resources");
        }

        for resource in self.resources.iter_mut().filter(|r| r.created && !r.deleted) {
            if let Err(e) = resource.delete(self.api.as_ref()).await {
                warn!(resource = %resource.kind, "Failed to delete prerequisite: {}", e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// In-memory API recording every call
    #[derive(Clone, Default)]
    pub(crate) struct FakeApi {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub create_response: Option<Value>,
        pub create_status: u16,
    }

    impl FakeApi {
        pub(crate) fn responding(body: Value) -> Self {
            Self {
                calls: Arc::default(),
                create_response: Some(body),
                create_status: 201,
            }
        }
    }

    #[async_trait]
    impl ResourceApi for FakeApi {
        async fn create(&self, url: &str, _payload: &Value) -> Result<(u16, Option<Value>)> {
            self.calls.lock().unwrap().push(format!("POST {}", url));
            Ok((self.create_status, self.create_response.clone()))
        }

        async fn delete(&self, url: &str) -> Result<u16> {
            self.calls.lock().unwrap().push(format!("DELETE {}", url));
            Ok(204)
        }
    }

    pub(crate) fn decl(path: &str, method: HttpMethod, subs: &[(&str, &str)]) -> PrerequisiteDecl {
        PrerequisiteDecl {
            path: path.to_string(),
            method,
            resource: ResourceKind::Identity,
            subs: subs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[tokio::test]
    async fn test_identity_attributes_renamed() {
        let api = FakeApi::responding(json!({"@id": "John", "name": "code-examples-validator"}));
        let calls = api.calls.clone();
        let mut registry = ResourceRegistry::new(Box::new(api), "http://api");

        let extracted = registry
            .create(&decl("users", HttpMethod::Post, &[("@id", "<username>"), ("missing", "x")]))
            .await;
        assert_eq!(extracted, json!({"<username>": "John"}).as_object().unwrap().clone());
        assert_eq!(calls.lock().unwrap().as_slice(), ["POST http://api/identities/v1"]);

        registry.cleanup().await;
        registry.cleanup().await;
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            ["POST http://api/identities/v1", "DELETE http://api/identities/v1/John"]
        );
        assert!(registry.resources()[0].deleted);
    }

    #[tokio::test]
    async fn test_failed_creation_yields_nothing() {
        let api = FakeApi {
            create_status: 500,
            create_response: Some(json!({"@id": "X"})),
            ..FakeApi::default()
        };
        let calls = api.calls.clone();
        let mut registry = ResourceRegistry::new(Box::new(api), "http://api");
        let extracted = registry
            .create(&decl("users", HttpMethod::Post, &[("@id", "<username>")]))
            .await;
        assert!(extracted.is_empty());

        // Nothing to delete without an identifier
        registry.cleanup().await;
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_product_removes_at_creation() {
        let api = FakeApi::default();
        let calls = api.calls.clone();
        let mut registry = ResourceRegistry::new(Box::new(api), "http://api/");
        let mut declaration = decl("products", HttpMethod::Post, &[]);
        declaration.resource = ResourceKind::DeleteProduct;

        assert!(registry.create(&declaration).await.is_empty());
        registry.cleanup().await;
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            ["DELETE http://api/products/v1/product-1"]
        );
    }

    #[test]
    fn test_declaration_from_yaml() {
        let decl: PrerequisiteDecl = serde_yaml::from_str(
            "path: api/products\nmethod: POST\nresource: identity\nsubs: {'@id': '<owner>'}\n",
        )
        .unwrap();
        assert_eq!(decl.resource, ResourceKind::Identity);
        assert_eq!(decl.method, HttpMethod::Post);
        assert_eq!(decl.subs["@id"], "<owner>");
    }
}

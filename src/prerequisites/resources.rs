//! Kinds of prerequisite resources

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

use super::api::ResourceApi;
use crate::common::Result;

/// A resource the API under test must (or must not) hold before a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ResourceKind {
    /// An owner identity, created and deleted again at session end
    #[serde(alias = "identity")]
    Identity,
    /// Makes sure `product-1` does not exist, so a sample can create it
    #[serde(alias = "delete_product")]
    DeleteProduct,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Identity => "Identity",
            ResourceKind::DeleteProduct => "DeleteProduct",
        }
    }

    fn base_path(&self) -> &'static str {
        match self {
            ResourceKind::Identity => "identities/v1",
            ResourceKind::DeleteProduct => "products/v1",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One created prerequisite, tracked until it is deleted
#[derive(Debug)]
pub struct PrerequisiteResource {
    pub kind: ResourceKind,
    /// Collection endpoint, e.g. `https://api/identities/v1`
    pub base_url: String,
    /// Identifier of the created resource, once known
    pub id: Option<String>,
    pub created: bool,
    pub deleted: bool,
}

impl PrerequisiteResource {
    pub fn new(kind: ResourceKind, api_url: &str) -> Self {
        Self {
            kind,
            base_url: format!("{}/{}", api_url.trim_end_matches('/'), kind.base_path()),
            id: None,
            created: false,
            deleted: false,
        }
    }

    /// Creation payload sent to the API
    pub fn payload(&self) -> Value {
        match self.kind {
            ResourceKind::Identity => json!({
                "name": "code-examples-validator",
                "context": "context",
                "type": "Owner",
            }),
            ResourceKind::DeleteProduct => json!({}),
        }
    }

    /// Issue the creation call; returns the response body of a successful
    /// creation
    pub async fn create(&mut self, api: &dyn ResourceApi) -> Result<Option<Value>> {
        debug!(resource = %self.kind, "creating prerequisite");
        let (status, body) = match self.kind {
            ResourceKind::Identity => {
                let (status, body) = api.create(&self.base_url, &self.payload()).await?;
                let body = body.filter(|_| (200..300).contains(&status));
                self.id = body
                    .as_ref()
                    .and_then(|b| b.get("@id"))
                    .and_then(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    });
                (status, body)
            }
            ResourceKind::DeleteProduct => {
                self.id = Some("product-1".to_string());
                let url = format!("{}/product-1", self.base_url);
                (api.delete(&url).await?, None)
            }
        };
        debug!(resource = %self.kind, status, "prerequisite created");
        self.created = true;
        if status >= 400 && self.kind == ResourceKind::Identity {
            warn!(resource = %self.kind, status, "Prerequisite creation returned an error status");
        }
        Ok(body)
    }

    /// Remove the resource from the API
    pub async fn delete(&mut self, api: &dyn ResourceApi) -> Result<()> {
        self.deleted = true;
        match (self.kind, &self.id) {
            (ResourceKind::Identity, Some(id)) => {
                debug!(resource = %self.kind, id = %id, "removing prerequisite");
                let status = api.delete(&format!("{}/{}", self.base_url, id)).await?;
                if status >= 400 {
                    warn!(resource = %self.kind, id = %id, status, "Failed to delete prerequisite");
                }
            }
            (ResourceKind::Identity, None) => {
                warn!(resource = %self.kind, "No identifier recorded, nothing to delete");
            }
            (ResourceKind::DeleteProduct, _) => {}
        }
        Ok(())
    }
}

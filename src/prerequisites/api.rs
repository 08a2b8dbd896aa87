//! HTTP access to the API under test for prerequisite resources

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::common::Result;

/// Create/delete calls used by prerequisite resources
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// POST `payload` to `url`; returns the status and the JSON body, if any
    async fn create(&self, url: &str, payload: &Value) -> Result<(u16, Option<Value>)>;

    /// DELETE `url`; returns the status
    async fn delete(&self, url: &str) -> Result<u16>;
}

/// [`ResourceApi`] over `reqwest`, authenticated with a bearer token
pub struct HttpResourceApi {
    client: reqwest::Client,
    bearer_token: Option<String>,
}

impl HttpResourceApi {
    pub fn new(bearer_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("samples-validator")
            .build()?;
        Ok(Self {
            client,
            bearer_token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn create(&self, url: &str, payload: &Value) -> Result<(u16, Option<Value>)> {
        debug!(url, "creating prerequisite resource");
        let response = self
            .authorize(self.client.post(url).json(payload))
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Ok((status, body))
    }

    async fn delete(&self, url: &str) -> Result<u16> {
        debug!(url, "deleting prerequisite resource");
        let response = self.authorize(self.client.delete(url)).send().await?;
        Ok(response.status().as_u16())
    }
}

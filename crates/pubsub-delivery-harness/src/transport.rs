//! HTTP transport used to reach the publisher and subscriber apps.
//!
//! The transport only moves bytes. Deciding what a status code means is left
//! to the caller: the publish driver wants 204, control calls want 200, the
//! no-topic scenario wants 404.

use crate::{HarnessError, HarnessResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response transport. Errors mean no response was obtained.
#[async_trait]
pub trait HarnessTransport: Send + Sync {
    /// POST `body` as `application/json`.
    async fn post_json(&self, url: &str, body: &Value) -> HarnessResult<HttpReply>;

    /// Plain GET.
    async fn get(&self, url: &str) -> HarnessResult<HttpReply>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> HarnessResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn read_reply(url: &str, response: reqwest::Response) -> HarnessResult<HttpReply> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HarnessError::transport(url, e))?;
        debug!(url = %url, status, body_len = body.len(), "HTTP reply");
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl HarnessTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &Value) -> HarnessResult<HttpReply> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| HarnessError::transport(url, e))?;
        Self::read_reply(url, response).await
    }

    async fn get(&self, url: &str) -> HarnessResult<HttpReply> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarnessError::transport(url, e))?;
        Self::read_reply(url, response).await
    }
}

//! reqwest-backed transport

use super::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::error::TransportError;
use arango_config::ConnectionConfig;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// HTTP transport using reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    /// Create a transport with a fresh client and a 30 second timeout.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new(), Duration::from_secs(30))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Transport using the configured request timeout
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::with_client(
            reqwest::Client::new(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        debug!("'{}' request to '{}'", req.method.as_str(), req.url);

        let mut builder = self
            .client
            .request(method, &req.url)
            .timeout(req.timeout.unwrap_or(self.timeout));

        if let Some(body) = req.body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse { status, text })
    }
}

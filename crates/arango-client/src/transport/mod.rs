//! HTTP transport seam.
//!
//! The cursor only needs `get/put/post/delete(url, data)` returning a status
//! and a body. Implementations are injected into a
//! [`Connection`](crate::Connection); [`ReqwestTransport`] is the default.
//!
//! ```rust,ignore
//! use arango_client::transport::{HttpRequest, ReqwestTransport, Transport};
//!
//! let transport = ReqwestTransport::new();
//! let response = transport.send(HttpRequest::get("http://localhost:8529/_api/version")).await?;
//! println!("Status: {}", response.status);
//! ```

mod http;

pub use http::ReqwestTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// HTTP methods used against the database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Get the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A single request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Target URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// JSON body, already encoded
    pub body: Option<String>,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    fn with_method(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            timeout: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Post, url)
    }

    /// Create a PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Put, url)
    }

    /// Create a DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Delete, url)
    }

    /// Set the request body (builder pattern).
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace the body; `None` leaves the request without one
    pub fn maybe_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    /// Set the timeout (builder pattern).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub text: String,
}

impl HttpResponse {
    /// Build a response from its parts
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Check if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.text)
    }
}

/// Something that can carry requests to the database
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// `GET url`
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::get(url)).await
    }

    /// `POST url` with an optional body
    async fn post(&self, url: &str, data: Option<String>) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::post(url).maybe_body(data)).await
    }

    /// `PUT url` with an optional body
    async fn put(&self, url: &str, data: Option<String>) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::put(url).maybe_body(data)).await
    }

    /// `DELETE url`
    async fn delete(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.send(HttpRequest::delete(url)).await
    }
}

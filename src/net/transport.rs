//! HTTP exchange types and the transport seam.
//!
//! ARCHITECTURE
//! ============
//! [`Transport`] performs exactly one HTTP exchange and knows nothing about
//! tokens, retries or status semantics. `ApiClient` layers the interceptor
//! pipeline and refresh-and-replay on top.
//!
//! Client-side (hydrate): `gloo-net` over the browser's `fetch`.
//! Native (`native` feature): `reqwest`.
//! Tests: a scripted mock in `test_support`.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// An outgoing API request.
///
/// `path` is either relative to the API base URL (`/auth/me`) or an absolute
/// URL for third-party hosts. `url` is filled in by `ApiClient` right before
/// the interceptor pipeline runs.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), url: String::new(), query: Vec::new(), headers: Vec::new(), body: None }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    #[must_use]
    pub fn query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Insert or replace a header (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            slot.1 = value.to_owned();
        } else {
            self.headers.push((name.to_owned(), value.to_owned()));
        }
    }

    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `path` without its query string, for endpoint matching.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(p, _)| p)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Convert a non-success response into the matching error.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ClientError`] for any non-2xx status.
    pub fn error_for_status(self, credential_endpoint: bool) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body, credential_endpoint))
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Performs one HTTP exchange.
///
/// `?Send` because browser futures are bound to the UI thread.
#[async_trait(?Send)]
pub trait Transport {
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when no response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;
}

#[cfg(feature = "native")]
pub use native::ReqwestTransport;

#[cfg(feature = "native")]
mod native {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{ApiRequest, ApiResponse, Method, Transport};
    use crate::config::HttpTimeouts;
    use crate::error::ClientError;

    /// `reqwest`-backed transport for native tools.
    pub struct ReqwestTransport {
        http: reqwest::Client,
    }

    impl ReqwestTransport {
        /// # Errors
        ///
        /// Returns [`ClientError::Network`] if the HTTP client cannot be built.
        pub fn new(timeouts: HttpTimeouts) -> Result<Self, ClientError> {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeouts.request_secs))
                .connect_timeout(Duration::from_secs(timeouts.connect_secs))
                .build()
                .map_err(|e| ClientError::Network(e.to_string()))?;
            Ok(Self { http })
        }
    }

    fn to_reqwest(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    #[async_trait(?Send)]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
            let mut builder = self.http.request(to_reqwest(request.method), &request.url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| ClientError::Network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| ClientError::Network(e.to_string()))?;
            Ok(ApiResponse { status, body })
        }
    }
}

#[cfg(feature = "hydrate")]
pub use browser::GlooTransport;

#[cfg(feature = "hydrate")]
mod browser {
    use async_trait::async_trait;
    use gloo_net::http::RequestBuilder;

    use super::{ApiRequest, ApiResponse, Method, Transport};
    use crate::error::ClientError;

    /// `fetch`-backed transport for the browser.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct GlooTransport;

    fn to_gloo(method: Method) -> gloo_net::http::Method {
        match method {
            Method::Get => gloo_net::http::Method::GET,
            Method::Post => gloo_net::http::Method::POST,
            Method::Put => gloo_net::http::Method::PUT,
            Method::Delete => gloo_net::http::Method::DELETE,
        }
    }

    #[async_trait(?Send)]
    impl Transport for GlooTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
            let mut builder = RequestBuilder::new(&request.url)
                .method(to_gloo(request.method))
                .query(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            let prepared = match &request.body {
                Some(body) => builder.json(body),
                None => builder.build(),
            }
            .map_err(|e| ClientError::Network(e.to_string()))?;

            let response = prepared.send().await.map_err(|e| ClientError::Network(e.to_string()))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| ClientError::Network(e.to_string()))?;
            Ok(ApiResponse { status, body })
        }
    }
}

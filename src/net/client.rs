//! Authenticated API client with an explicit interceptor pipeline.
//!
//! ARCHITECTURE
//! ============
//! `ApiClient` owns the base URL, a [`Transport`], and an ordered list of
//! [`Interceptor`]s. Every request runs `before_send` through the pipeline in
//! insertion order, goes over the transport, then runs `after_receive` in the
//! same order. Nothing is patched globally; tests build their own client.
//!
//! Refresh-and-replay lives in one place, [`ApiClient::send_authorized`]:
//! a 401 from a non-credential endpoint triggers at most one refresh through
//! the [`TokenRefresher`] and at most one replay.
//!
//! TRADE-OFFS
//! ==========
//! A request that raced a concurrent refresh (its token was rotated while it
//! was in flight) replays with the rotated token without refreshing again.
//! This keeps parallel 401s down to a single refresh call at the cost of one
//! wasted round-trip per raced request.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::rc::Rc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::api::is_credential_endpoint;
use super::transport::{ApiRequest, ApiResponse, Transport};
use crate::error::ClientError;

// =============================================================================
// SEAMS
// =============================================================================

/// A request/response transformer in the client pipeline.
pub trait Interceptor {
    fn before_send(&self, _request: &mut ApiRequest) {}

    fn after_receive(&self, _request: &ApiRequest, _response: &ApiResponse) {}
}

/// Supplies the bearer credential for outgoing requests.
pub trait AccessTokenSource {
    fn access_token(&self) -> Option<String>;
}

/// Recovers from an expired access token.
#[async_trait(?Send)]
pub trait TokenRefresher {
    /// The access token requests are currently sent with.
    fn current_token(&self) -> Option<String>;

    /// Obtain a usable access token after `rejected` was answered with 401.
    ///
    /// # Errors
    ///
    /// Returns the refresh failure; implementations clear the session first.
    async fn refresh_rejected(&self, rejected: Option<String>) -> Result<(), ClientError>;

    /// The replayed request was rejected too; the session is unrecoverable.
    async fn expire(&self);
}

// =============================================================================
// BUILT-IN INTERCEPTORS
// =============================================================================

/// Declares JSON on every request.
pub struct JsonHeaders;

impl Interceptor for JsonHeaders {
    fn before_send(&self, request: &mut ApiRequest) {
        if request.header_value("Accept").is_none() {
            request.set_header("Accept", "application/json");
        }
        if request.body.is_some() && request.header_value("Content-Type").is_none() {
            request.set_header("Content-Type", "application/json");
        }
    }
}

/// Attaches `Authorization: Bearer <token>` to the application's own API.
///
/// Skips other hosts, the credential endpoints, and requests that already
/// carry an explicit `Authorization` header.
pub struct BearerAuth {
    base_url: String,
    tokens: Rc<dyn AccessTokenSource>,
}

impl BearerAuth {
    #[must_use]
    pub fn new(base_url: &str, tokens: Rc<dyn AccessTokenSource>) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned(), tokens }
    }

    fn targets_own_api(&self, request: &ApiRequest) -> bool {
        request.url == self.base_url || request.url.starts_with(&format!("{}/", self.base_url))
    }
}

impl Interceptor for BearerAuth {
    fn before_send(&self, request: &mut ApiRequest) {
        if !self.targets_own_api(request) || is_credential_endpoint(request.endpoint()) {
            return;
        }
        if request.header_value("Authorization").is_some() {
            return;
        }
        if let Some(token) = self.tokens.access_token() {
            request.set_header("Authorization", &format!("Bearer {token}"));
        }
    }
}

/// Debug-level request log.
pub struct RequestLog;

impl Interceptor for RequestLog {
    fn after_receive(&self, request: &ApiRequest, response: &ApiResponse) {
        tracing::debug!(
            method = request.method.as_str(),
            path = %request.endpoint(),
            status = response.status,
            "api request completed"
        );
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct ApiClient {
    base_url: String,
    transport: Rc<dyn Transport>,
    interceptors: Vec<Rc<dyn Interceptor>>,
}

impl ApiClient {
    /// A client with no interceptors.
    #[must_use]
    pub fn new(base_url: &str, transport: Rc<dyn Transport>) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned(), transport, interceptors: Vec::new() }
    }

    /// Append an interceptor; it runs after those already installed.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Rc::new(interceptor));
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// One exchange through the pipeline. Non-2xx statuses are returned as
    /// responses, not errors.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] when no response was received.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut prepared = request.clone();
        prepared.url = self.resolve_url(&prepared.path);
        for interceptor in &self.interceptors {
            interceptor.before_send(&mut prepared);
        }

        let response = match self.transport.send(&prepared).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(method = prepared.method.as_str(), path = %prepared.endpoint(), error = %err, "api request failed");
                return Err(err);
            }
        };

        for interceptor in &self.interceptors {
            interceptor.after_receive(&prepared, &response);
        }
        Ok(response)
    }

    /// Send and decode a request that needs no session (login, register,
    /// refresh) or whose 401 must not trigger a refresh.
    ///
    /// # Errors
    ///
    /// Network failures, classified non-2xx statuses, or decode failures.
    pub async fn execute_public<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        let credential = is_credential_endpoint(request.endpoint());
        self.send(request).await?.error_for_status(credential)?.json()
    }

    /// Send with one refresh-and-replay on 401.
    ///
    /// Returns the final response (which may still be a non-401 failure).
    ///
    /// # Errors
    ///
    /// - Network failures from either attempt.
    /// - The original 401 as [`ClientError::Auth`] when the refresh fails.
    /// - [`ClientError::RefreshExhausted`] when the replay is rejected again.
    pub async fn send_authorized(
        &self,
        request: &ApiRequest,
        refresher: &dyn TokenRefresher,
    ) -> Result<ApiResponse, ClientError> {
        let used_token = refresher.current_token();
        let response = self.send(request).await?;
        if response.status != 401 || is_credential_endpoint(request.endpoint()) {
            return Ok(response);
        }

        tracing::debug!(path = %request.endpoint(), "access token rejected; refreshing");
        if let Err(err) = refresher.refresh_rejected(used_token).await {
            tracing::info!(path = %request.endpoint(), error = %err, "token refresh failed; surfacing original 401");
            return Err(ClientError::from_status(response.status, &response.body, false));
        }

        let replay = self.send(request).await?;
        if replay.status == 401 {
            let reason = ClientError::from_status(replay.status, &replay.body, false).to_string();
            tracing::warn!(path = %request.endpoint(), "replayed request rejected; session expired");
            refresher.expire().await;
            return Err(ClientError::RefreshExhausted(reason));
        }
        Ok(replay)
    }

    /// [`send_authorized`](Self::send_authorized), then classify and decode.
    ///
    /// # Errors
    ///
    /// Everything `send_authorized` returns, plus classified non-2xx statuses
    /// and decode failures.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        refresher: &dyn TokenRefresher,
    ) -> Result<T, ClientError> {
        let credential = is_credential_endpoint(request.endpoint());
        self.send_authorized(request, refresher)
            .await?
            .error_for_status(credential)?
            .json()
    }
}

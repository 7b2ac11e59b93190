//! Account moderation for administrators.
//!
//! Every call goes through the session's authenticated helper, so an expired
//! access token is refreshed and the call replayed once. The backend enforces
//! the admin role; a non-admin caller gets [`ClientError::Auth`] with 403.

#[cfg(test)]
#[path = "admin_test.rs"]
mod admin_test;

use super::api;
use super::transport::ApiRequest;
use super::types::{AccountStatus, StatusChange, StatusUpdate, UserFilter, UserPage};
use crate::error::ClientError;
use crate::state::session::SessionManager;

#[derive(Clone)]
pub struct AdminApi {
    session: SessionManager,
}

impl AdminApi {
    #[must_use]
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// One page of accounts matching `filter`.
    ///
    /// # Errors
    ///
    /// Anything [`SessionManager::execute`] returns.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<UserPage, ClientError> {
        let request = ApiRequest::get(api::ADMIN_USERS).query_pairs(filter.to_query());
        self.session.execute(&request).await
    }

    /// Accounts awaiting approval.
    ///
    /// # Errors
    ///
    /// Anything [`SessionManager::execute`] returns.
    pub async fn pending_users(&self, page: u32, limit: u32) -> Result<UserPage, ClientError> {
        let filter = UserFilter { page, limit, ..UserFilter::default() };
        let request = ApiRequest::get(api::ADMIN_PENDING_USERS).query_pairs(filter.to_query());
        self.session.execute(&request).await
    }

    /// # Errors
    ///
    /// Anything [`SessionManager::execute`] returns.
    pub async fn set_status(&self, user_id: i64, status: AccountStatus) -> Result<StatusChange, ClientError> {
        let request = ApiRequest::put(api::user_status_endpoint(user_id)).json(&StatusUpdate { status })?;
        let change = self.session.execute(&request).await?;
        tracing::info!(user_id, status = %status, "account status changed");
        Ok(change)
    }

    /// # Errors
    ///
    /// Anything [`SessionManager::execute`] returns.
    pub async fn approve(&self, user_id: i64) -> Result<StatusChange, ClientError> {
        let change = self.session.execute(&ApiRequest::post(api::approve_user_endpoint(user_id))).await?;
        tracing::info!(user_id, "account approved");
        Ok(change)
    }

    /// # Errors
    ///
    /// Anything [`SessionManager::execute`] returns.
    pub async fn reject(&self, user_id: i64) -> Result<StatusChange, ClientError> {
        let change = self.session.execute(&ApiRequest::post(api::reject_user_endpoint(user_id))).await?;
        tracing::info!(user_id, "account rejected");
        Ok(change)
    }
}

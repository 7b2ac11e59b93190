//! Session lifecycle for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionManager` is constructed once at bootstrap and handed to the
//! navigator, pages, and API wrappers. It exclusively owns the in-memory
//! [`Session`] and writes every change through to the [`TokenStore`].
//!
//! ARCHITECTURE
//! ============
//! The manager is a cheap `Rc` handle. Profile fetch, token refresh, and
//! `init()` are single-flight: the first caller starts a shared future and
//! parks it in a slot, later callers await a clone of it, and the future
//! empties its own slot when it finishes.
//!
//! ERROR HANDLING
//! ==============
//! `get_current_user()` never fails; any failure clears the session and
//! yields `None`. `refresh_token()` clears the session before returning its
//! error. Login/register errors leave the session untouched.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use serde::de::DeserializeOwned;

use super::token_store::{CachedProfile, TokenStore};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::net::api;
use crate::net::client::{AccessTokenSource, ApiClient, BearerAuth, JsonHeaders, RequestLog, TokenRefresher};
use crate::net::transport::{ApiRequest, Transport};
use crate::net::types::{
    AccountStatus, AccountStatusReport, LoginRequest, RefreshRequest, RegisterRequest, RegisteredAccount, Role,
    TokenResponse, UserProfile,
};
use crate::util::clock::{is_fresh, now_ms};

type Flight<T> = Shared<LocalBoxFuture<'static, T>>;

// =============================================================================
// SESSION STATE
// =============================================================================

/// In-memory authentication state.
///
/// Authentication and admin flags are derived, never stored, so they cannot
/// drift from the token and profile they depend on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// When the server last confirmed `user` (epoch ms).
    pub last_checked_at_ms: Option<i64>,
    /// Whether `init()` has completed.
    pub initialized: bool,
}

impl Session {
    /// An access token is held and the last profile fetch succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_admin)
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_teacher)
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.user.as_ref().is_some_and(UserProfile::is_student)
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        let authenticated = self.is_authenticated();
        let user = self.user.as_ref().filter(|_| authenticated);
        SessionView {
            initialized: self.initialized,
            authenticated,
            role: user.map(|u| u.role),
            status: user.map(|u| u.status),
        }
    }
}

impl AccessTokenSource for RefCell<Session> {
    fn access_token(&self) -> Option<String> {
        self.borrow().access_token.clone()
    }
}

/// The slice of session state the navigation guard reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionView {
    pub initialized: bool,
    pub authenticated: bool,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

impl SessionView {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.authenticated && self.role.is_some_and(Role::is_admin_tier)
    }

    #[must_use]
    pub fn is_teacher_tier(&self) -> bool {
        self.authenticated && self.role.is_some_and(Role::is_teacher_tier)
    }
}

// =============================================================================
// MANAGER
// =============================================================================

#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<Inner>,
}

struct Inner {
    api: ApiClient,
    store: TokenStore,
    state: Rc<RefCell<Session>>,
    profile_ttl_ms: i64,
    /// Bumped by every successful login; flights started under an older
    /// value must not touch the newer session.
    sign_ins: Cell<u64>,
    init_flight: RefCell<Option<Flight<Result<(), ClientError>>>>,
    profile_flight: RefCell<Option<Flight<Option<UserProfile>>>>,
    refresh_flight: RefCell<Option<Flight<Result<String, ClientError>>>>,
}

/// Return the in-flight future in `slot`, or start one with `start`.
fn join_flight<T: Clone + 'static>(
    slot: &RefCell<Option<Flight<T>>>,
    start: impl FnOnce() -> LocalBoxFuture<'static, T>,
) -> Flight<T> {
    let mut slot = slot.borrow_mut();
    if let Some(flight) = slot.as_ref() {
        return flight.clone();
    }
    let flight = start().shared();
    *slot = Some(flight.clone());
    flight
}

impl SessionManager {
    /// Build a manager whose API client carries the standard pipeline:
    /// JSON headers, bearer auth from this session, request logging.
    #[must_use]
    pub fn new(config: &ClientConfig, transport: Rc<dyn Transport>, store: TokenStore) -> Self {
        let state = Rc::new(RefCell::new(Session::default()));
        let tokens: Rc<dyn AccessTokenSource> = state.clone();
        let api = ApiClient::new(&config.api_base_url, transport)
            .with_interceptor(JsonHeaders)
            .with_interceptor(BearerAuth::new(&config.api_base_url, tokens))
            .with_interceptor(RequestLog);

        Self {
            inner: Rc::new(Inner {
                api,
                store,
                state,
                profile_ttl_ms: config.profile_ttl_ms(),
                sign_ins: Cell::new(0),
                init_flight: RefCell::new(None),
                profile_flight: RefCell::new(None),
                refresh_flight: RefCell::new(None),
            }),
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        self.inner.state.borrow().view()
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        self.inner.state.borrow().is_teacher()
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.inner.state.borrow().is_student()
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    // -------------------------------------------------------------------------
    // Bootstrap
    // -------------------------------------------------------------------------

    /// Restore the session from storage, once.
    ///
    /// A fresh cached profile is trusted as-is; a stale or missing one is
    /// re-fetched. Later calls return immediately; concurrent calls share
    /// the first one. The session is marked initialized even on failure.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] when the storage backend cannot be
    /// read; the session is left unauthenticated.
    pub async fn init(&self) -> Result<(), ClientError> {
        if self.is_initialized() {
            return Ok(());
        }
        let flight = join_flight(&self.inner.init_flight, || {
            let this = self.clone();
            async move {
                let result = this.restore().await;
                if let Err(err) = &result {
                    tracing::error!(error = %err, "session restore failed; continuing signed out");
                    this.clear_memory();
                }
                this.inner.state.borrow_mut().initialized = true;
                this.inner.init_flight.borrow_mut().take();
                result
            }
            .boxed_local()
        });
        flight.await
    }

    async fn restore(&self) -> Result<(), ClientError> {
        let persisted = self.inner.store.load()?;
        let Some(access_token) = persisted.access_token else {
            if persisted.refresh_token.is_some() || persisted.profile.is_some() {
                tracing::debug!("dropping persisted session leftovers without an access token");
                if let Err(err) = self.inner.store.clear() {
                    tracing::warn!(error = %err, "failed to clear persisted session");
                }
            }
            return Ok(());
        };

        {
            let mut state = self.inner.state.borrow_mut();
            state.access_token = Some(access_token);
            state.refresh_token = persisted.refresh_token;
        }

        match persisted.profile {
            Some(CachedProfile { user, checked_at_ms: Some(checked_at) })
                if is_fresh(checked_at, now_ms(), self.inner.profile_ttl_ms) =>
            {
                tracing::debug!(user_id = user.id, "restored cached profile");
                let mut state = self.inner.state.borrow_mut();
                state.user = Some(user);
                state.last_checked_at_ms = Some(checked_at);
            }
            _ => {
                tracing::debug!("cached profile stale or missing; fetching");
                self.get_current_user().await;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------

    /// Exchange credentials for a token pair and profile.
    ///
    /// # Errors
    ///
    /// Network failures, [`ClientError::Validation`] for rejected credentials
    /// or unapproved accounts, decode failures, or a storage failure while
    /// persisting. The session is unchanged on error.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<UserProfile, ClientError> {
        let request = ApiRequest::post(api::LOGIN).json(credentials)?;
        let tokens: TokenResponse = self.inner.api.execute_public(&request).await.inspect_err(|err| {
            tracing::info!(error = %err, "login rejected");
        })?;
        let user = tokens
            .user
            .ok_or_else(|| ClientError::Decode("login response carried no user profile".to_owned()))?;

        let checked_at = now_ms();
        self.inner
            .store
            .save(&tokens.access_token, &tokens.refresh_token, &user, checked_at)?;

        {
            let mut state = self.inner.state.borrow_mut();
            state.access_token = Some(tokens.access_token);
            state.refresh_token = Some(tokens.refresh_token);
            state.user = Some(user.clone());
            state.last_checked_at_ms = Some(checked_at);
            state.initialized = true;
        }
        self.inner.sign_ins.set(self.inner.sign_ins.get() + 1);
        tracing::info!(user_id = user.id, role = %user.role, status = %user.status, "signed in");
        Ok(user)
    }

    /// Submit a registration. New accounts await approval, so the session is
    /// not signed in and any tokens in the response are ignored.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] from local checks or the backend, network
    /// failures, or decode failures.
    pub async fn register(&self, data: &RegisterRequest) -> Result<RegisteredAccount, ClientError> {
        data.validate()?;
        let request = ApiRequest::post(api::REGISTER).json(data)?;
        let account: RegisteredAccount = self.inner.api.execute_public(&request).await?;
        tracing::info!(email = %data.email, role = %data.role, "registration submitted");
        Ok(account)
    }

    // -------------------------------------------------------------------------
    // Profile
    // -------------------------------------------------------------------------

    /// Fetch the authoritative profile.
    ///
    /// Overlapping calls share one request. Any failure, including an
    /// exhausted refresh, signs the session out and returns `None`.
    pub async fn get_current_user(&self) -> Option<UserProfile> {
        if self.inner.state.borrow().access_token.is_none() {
            return None;
        }
        let flight = join_flight(&self.inner.profile_flight, || {
            let this = self.clone();
            async move {
                let user = this.fetch_profile().await;
                this.inner.profile_flight.borrow_mut().take();
                user
            }
            .boxed_local()
        });
        flight.await
    }

    async fn fetch_profile(&self) -> Option<UserProfile> {
        let sign_in = self.inner.sign_ins.get();
        let result = self.execute::<UserProfile>(&ApiRequest::get(api::ME)).await;
        if self.inner.sign_ins.get() != sign_in {
            tracing::debug!("signed in again during profile fetch; discarding result");
            return self.user();
        }
        match result {
            Ok(user) => {
                self.apply_profile(&user);
                Some(user)
            }
            Err(err) => {
                tracing::info!(error = %err, code = err.error_code(), "profile fetch failed; signing out");
                self.logout().await;
                None
            }
        }
    }

    /// Poll `/auth/check-status`, refreshing the cached profile.
    ///
    /// # Errors
    ///
    /// Anything [`execute`](Self::execute) returns.
    pub async fn check_status(&self) -> Result<AccountStatusReport, ClientError> {
        let report: AccountStatusReport = self.execute(&ApiRequest::get(api::CHECK_STATUS)).await?;
        if self.inner.state.borrow().access_token.is_some() {
            self.apply_profile(&report.user);
        }
        Ok(report)
    }

    fn apply_profile(&self, user: &UserProfile) {
        let checked_at = now_ms();
        let (access, refresh) = {
            let mut state = self.inner.state.borrow_mut();
            state.user = Some(user.clone());
            state.last_checked_at_ms = Some(checked_at);
            (state.access_token.clone(), state.refresh_token.clone())
        };
        let Some(access) = access else {
            return;
        };
        let refresh = refresh.unwrap_or_default();
        if let Err(err) = self.inner.store.save(&access, &refresh, user, checked_at) {
            tracing::warn!(error = %err, "failed to persist refreshed profile");
        }
    }

    // -------------------------------------------------------------------------
    // Tokens
    // -------------------------------------------------------------------------

    /// Rotate the token pair.
    ///
    /// Overlapping calls share one request, so concurrent refreshes can never
    /// persist mismatched pairs.
    ///
    /// # Errors
    ///
    /// [`ClientError::RefreshExhausted`] when there is no refresh token or the
    /// backend rejects it, or the network/server failure. The session is
    /// signed out before the error is returned.
    pub async fn refresh_token(&self) -> Result<String, ClientError> {
        let flight = join_flight(&self.inner.refresh_flight, || {
            let this = self.clone();
            async move {
                let sign_in = this.inner.sign_ins.get();
                let result = this.exchange_refresh_token().await;
                if this.inner.sign_ins.get() != sign_in {
                    tracing::debug!("signed in again during token refresh; keeping new session");
                } else if let Err(err) = &result {
                    tracing::warn!(error = %err, "token refresh failed; signing out");
                    this.logout().await;
                }
                this.inner.refresh_flight.borrow_mut().take();
                result
            }
            .boxed_local()
        });
        flight.await
    }

    async fn exchange_refresh_token(&self) -> Result<String, ClientError> {
        let refresh = self.inner.state.borrow().refresh_token.clone();
        let Some(refresh) = refresh else {
            return Err(ClientError::RefreshExhausted("no refresh token".to_owned()));
        };

        let sign_in = self.inner.sign_ins.get();
        let request = ApiRequest::post(api::REFRESH).json(&RefreshRequest { refresh_token: &refresh })?;
        let tokens: TokenResponse = self
            .inner
            .api
            .execute_public(&request)
            .await
            .map_err(|err| match err {
                ClientError::Validation { message, .. } | ClientError::Auth { message, .. } => {
                    ClientError::RefreshExhausted(message)
                }
                other => other,
            })?;

        if self.inner.sign_ins.get() != sign_in {
            tracing::debug!("signed in again during token refresh; discarding rotated pair");
            return self
                .access_token()
                .ok_or_else(|| ClientError::RefreshExhausted("signed out during refresh".to_owned()));
        }

        let checked_at = now_ms();
        let user = {
            let mut state = self.inner.state.borrow_mut();
            state.access_token = Some(tokens.access_token.clone());
            state.refresh_token = Some(tokens.refresh_token.clone());
            if let Some(user) = tokens.user {
                state.user = Some(user);
                state.last_checked_at_ms = Some(checked_at);
            }
            state.user.clone()
        };

        let persisted = match user {
            Some(user) => {
                let stamped = self.inner.state.borrow().last_checked_at_ms.unwrap_or(checked_at);
                self.inner
                    .store
                    .save(&tokens.access_token, &tokens.refresh_token, &user, stamped)
            }
            None => self.inner.store.save_tokens(&tokens.access_token, &tokens.refresh_token),
        };
        if let Err(err) = persisted {
            tracing::warn!(error = %err, "failed to persist rotated tokens");
        }
        tracing::debug!("access token rotated");
        Ok(tokens.access_token)
    }

    // -------------------------------------------------------------------------
    // Sign out
    // -------------------------------------------------------------------------

    /// Clear the session locally, then tell the backend (best effort).
    pub async fn logout(&self) {
        let Some(token) = self.clear_local() else {
            return;
        };
        let request = ApiRequest::post(api::LOGOUT).header("Authorization", &format!("Bearer {token}"));
        match self.inner.api.send(&request).await {
            Ok(response) if response.is_success() => tracing::debug!("backend acknowledged logout"),
            Ok(response) => tracing::debug!(status = response.status, "backend logout notification rejected"),
            Err(err) => tracing::debug!(error = %err, "backend logout notification failed"),
        }
    }

    /// Clear memory and storage without contacting the backend. Returns the
    /// access token that was in use, if any.
    pub fn clear_local(&self) -> Option<String> {
        let previous = self.clear_memory();
        if let Err(err) = self.inner.store.clear() {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
        if previous.is_some() {
            tracing::info!("signed out");
        }
        previous
    }

    fn clear_memory(&self) -> Option<String> {
        let mut state = self.inner.state.borrow_mut();
        let previous = state.access_token.take();
        state.refresh_token = None;
        state.user = None;
        state.last_checked_at_ms = None;
        previous
    }

    // -------------------------------------------------------------------------
    // Authenticated requests
    // -------------------------------------------------------------------------

    /// Send `request` with this session's bearer token, refreshing and
    /// replaying once on 401, then decode the body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ClientError> {
        self.inner.api.execute(request, self).await
    }
}

#[async_trait(?Send)]
impl TokenRefresher for SessionManager {
    fn current_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    async fn refresh_rejected(&self, rejected: Option<String>) -> Result<(), ClientError> {
        let current = self.current_token();
        if current.is_some() && current != rejected {
            tracing::debug!("token already rotated by a concurrent refresh");
            return Ok(());
        }
        self.refresh_token().await.map(|_| ())
    }

    async fn expire(&self) {
        self.logout().await;
    }
}

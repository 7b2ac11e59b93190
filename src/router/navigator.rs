//! Applies guard decisions to navigation requests.
//!
//! SYSTEM CONTEXT
//! ==============
//! The navigator owns the committed location. Pages ask it to navigate; it
//! waits for session initialization on the first transition, resolves the
//! target, runs the guard, follows redirects, and performs forced sign-outs.
//!
//! DESIGN
//! ======
//! Every request takes a ticket from a generation counter. After each await
//! the ticket is compared with the counter; if a newer navigation started in
//! the meantime the older one reports `Superseded` and commits nothing.
//! Redirect chains are bounded so a misconfigured table fails loudly.

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::guard::{self, GuardDecision};
use super::routes::{DASHBOARD_PATH, LOGIN_PATH, ROOT_PATH, RouteMatch, RouteTable};
use crate::config::ClientConfig;
use crate::state::session::SessionManager;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation to {target} exceeded {hops} redirects")]
    RedirectLoop { target: String, hops: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Committed(RouteMatch),
    /// A newer navigation started before this one finished.
    Superseded,
}

pub struct Navigator {
    session: SessionManager,
    routes: Rc<RouteTable>,
    max_redirects: usize,
    generation: Cell<u64>,
    current: RefCell<Option<RouteMatch>>,
}

impl Navigator {
    #[must_use]
    pub fn new(session: SessionManager, routes: Rc<RouteTable>, config: &ClientConfig) -> Self {
        Self {
            session,
            routes,
            max_redirects: config.max_redirects,
            generation: Cell::new(0),
            current: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The last committed location.
    #[must_use]
    pub fn current(&self) -> Option<RouteMatch> {
        self.current.borrow().clone()
    }

    /// Navigate to `target` (path with optional query).
    ///
    /// # Errors
    ///
    /// [`NavigationError::RedirectLoop`] when guard redirects do not settle
    /// within the configured hop limit.
    pub async fn navigate(&self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let ticket = self.generation.get() + 1;
        self.generation.set(ticket);

        if !self.session.is_initialized() {
            if let Err(err) = self.session.init().await {
                tracing::error!(error = %err, "session init failed; navigating signed out");
            }
            if self.is_stale(ticket) {
                return Ok(NavigationOutcome::Superseded);
            }
        }

        let mut location = target.to_owned();
        for _ in 0..=self.max_redirects {
            let Some(matched) = self.routes.resolve(&location) else {
                tracing::debug!(%location, "no matching route; redirecting to landing");
                location = ROOT_PATH.to_owned();
                continue;
            };

            match guard::evaluate(&matched, &self.session.view()) {
                GuardDecision::Allow => {
                    tracing::debug!(route = matched.route.name, path = %matched.full_path, "navigation committed");
                    *self.current.borrow_mut() = Some(matched.clone());
                    return Ok(NavigationOutcome::Committed(matched));
                }
                GuardDecision::Redirect(next) => {
                    tracing::debug!(from = %matched.full_path, to = %next, "guard redirect");
                    location = next;
                }
                GuardDecision::LogoutAndRedirect(next) => {
                    tracing::info!(from = %matched.full_path, "account locked out; signing out");
                    self.session.logout().await;
                    if self.is_stale(ticket) {
                        return Ok(NavigationOutcome::Superseded);
                    }
                    location = next;
                }
            }
        }

        tracing::error!(requested = %target, hops = self.max_redirects, "redirect loop");
        Err(NavigationError::RedirectLoop { target: target.to_owned(), hops: self.max_redirects })
    }

    /// Re-run the guard on the current location, e.g. after login or logout.
    ///
    /// # Errors
    ///
    /// See [`navigate`](Self::navigate).
    pub async fn revalidate(&self) -> Result<NavigationOutcome, NavigationError> {
        let location = self
            .current()
            .map_or_else(|| ROOT_PATH.to_owned(), |current| current.full_path);
        self.navigate(&location).await
    }

    /// Where to go after a successful login from the current location.
    #[must_use]
    pub fn login_return_path(&self) -> String {
        self.current()
            .filter(|current| current.route.path == LOGIN_PATH)
            .map_or_else(|| DASHBOARD_PATH.to_owned(), |login| guard::return_target(&login))
    }

    fn is_stale(&self, ticket: u64) -> bool {
        let stale = self.generation.get() != ticket;
        if stale {
            tracing::debug!(ticket, "navigation superseded");
        }
        stale
    }
}

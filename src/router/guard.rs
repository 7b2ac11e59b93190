//! The navigation guard: a pure decision over a resolved target and the
//! session as it stands.
//!
//! RULES
//! =====
//! Evaluated in order, first match wins:
//! 1. Always-accessible routes are allowed.
//! 2. Authenticated users on the landing route go to their status landing.
//! 3. Protected routes send anonymous users to login with a return target.
//! 4. Guest-only routes send authenticated users to their status landing.
//! 5. Admin routes send non-admins to the dashboard.
//! 6. Rejected or blocked accounts are signed out and sent to login.
//! 7. Pending accounts are sent to the waiting-approval screen.
//! 8. Teacher routes send other roles to the read-only view, or the dashboard.
//! 9. Everything else is allowed.
//!
//! Waiting for `init()` happens in the navigator before any of this runs.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use super::routes::{DASHBOARD_PATH, LOGIN_PATH, REDIRECT_QUERY, ROOT_PATH, RouteMatch, WAITING_APPROVAL_PATH, fill_pattern};
use crate::net::types::AccountStatus;
use crate::state::session::SessionView;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
    /// Sign the session out, then go to the location.
    LogoutAndRedirect(String),
}

#[must_use]
pub fn evaluate(target: &RouteMatch, session: &SessionView) -> GuardDecision {
    let route = &target.route;

    if route.always_accessible {
        return GuardDecision::Allow;
    }

    if route.path == ROOT_PATH && session.authenticated {
        return GuardDecision::Redirect(status_landing(session.status).to_owned());
    }

    if route.requires_auth && !session.authenticated {
        return GuardDecision::Redirect(login_location(&target.full_path));
    }

    if route.guest_only && session.authenticated {
        return GuardDecision::Redirect(status_landing(session.status).to_owned());
    }

    if route.requires_admin && !session.is_admin() {
        return GuardDecision::Redirect(DASHBOARD_PATH.to_owned());
    }

    if session.authenticated {
        match session.status {
            Some(status) if status.is_locked_out() => {
                return GuardDecision::LogoutAndRedirect(LOGIN_PATH.to_owned());
            }
            Some(AccountStatus::Pending) => return GuardDecision::Redirect(WAITING_APPROVAL_PATH.to_owned()),
            _ => {}
        }
    }

    if route.requires_teacher && !session.is_teacher_tier() {
        let fallback = route
            .read_only_view
            .and_then(|pattern| fill_pattern(pattern, &target.params))
            .unwrap_or_else(|| DASHBOARD_PATH.to_owned());
        return GuardDecision::Redirect(fallback);
    }

    GuardDecision::Allow
}

/// Where an authenticated user lands when they hit a guest page.
#[must_use]
pub fn status_landing(status: Option<AccountStatus>) -> &'static str {
    match status {
        Some(AccountStatus::Pending) => WAITING_APPROVAL_PATH,
        _ => DASHBOARD_PATH,
    }
}

/// `/login?redirect=<target>`, with the target percent-encoded.
#[must_use]
pub fn login_location(return_to: &str) -> String {
    format!("{LOGIN_PATH}?{REDIRECT_QUERY}={}", urlencoding::encode(return_to))
}

/// The post-login destination carried by a login location. Only same-site
/// absolute paths are honoured; anything else yields the dashboard.
#[must_use]
pub fn return_target(login: &RouteMatch) -> String {
    login
        .query(REDIRECT_QUERY)
        .filter(|target| is_same_site_path(target))
        .unwrap_or_else(|| DASHBOARD_PATH.to_owned())
}

/// An absolute path on this origin. `//host` and `/\host` are read by
/// browsers as another origin; backslashes and control characters are never
/// accepted.
fn is_same_site_path(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.chars().any(|c| c == '\\' || c.is_control())
}

//! Portal REST endpoint paths, relative to the configured API base URL.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const REFRESH: &str = "/auth/refresh";
pub const LOGOUT: &str = "/auth/logout";
pub const ME: &str = "/auth/me";
pub const CHECK_STATUS: &str = "/auth/check-status";
pub const ADMIN_USERS: &str = "/admin/users";
pub const ADMIN_PENDING_USERS: &str = "/admin/pending-users";

/// Endpoints that must work without (and never send) a bearer token, and
/// whose 401 answers are never treated as an expired session.
const CREDENTIAL_ENDPOINTS: [&str; 3] = [LOGIN, REGISTER, REFRESH];

/// Whether `path` is login, register or refresh (query string ignored).
#[must_use]
pub fn is_credential_endpoint(path: &str) -> bool {
    let bare = path.split_once('?').map_or(path, |(p, _)| p);
    let bare = bare.trim_end_matches('/');
    CREDENTIAL_ENDPOINTS.contains(&bare)
}

#[must_use]
pub fn user_status_endpoint(user_id: i64) -> String {
    format!("{ADMIN_USERS}/{user_id}/status")
}

#[must_use]
pub fn approve_user_endpoint(user_id: i64) -> String {
    format!("{ADMIN_USERS}/{user_id}/approve")
}

#[must_use]
pub fn reject_user_endpoint(user_id: i64) -> String {
    format!("{ADMIN_USERS}/{user_id}/reject")
}

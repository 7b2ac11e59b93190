//! Static route descriptors and path matching.
//!
//! Patterns are `/`-separated; a segment starting with `:` captures one
//! non-empty path segment. Query strings are ignored for matching but kept on
//! the match so the guard can preserve them in a login redirect.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::collections::BTreeMap;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const WAITING_APPROVAL_PATH: &str = "/waiting-approval";

/// Query parameter carrying the post-login return target.
pub const REDIRECT_QUERY: &str = "redirect";

/// Per-route access metadata read by the guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
    pub guest_only: bool,
    pub requires_admin: bool,
    pub requires_teacher: bool,
    /// Bypasses every guard rule.
    pub always_accessible: bool,
    /// Pattern of the read-only page to fall back to when the teacher-tier
    /// check fails. Parameters are filled from the current match.
    pub read_only_view: Option<&'static str>,
}

impl RouteDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            requires_auth: false,
            guest_only: false,
            requires_admin: false,
            requires_teacher: false,
            always_accessible: false,
            read_only_view: None,
        }
    }

    #[must_use]
    pub const fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    #[must_use]
    pub const fn guest_only(mut self) -> Self {
        self.guest_only = true;
        self
    }

    #[must_use]
    pub const fn admin(mut self) -> Self {
        self.requires_auth = true;
        self.requires_admin = true;
        self
    }

    #[must_use]
    pub const fn teacher(mut self, read_only_view: Option<&'static str>) -> Self {
        self.requires_auth = true;
        self.requires_teacher = true;
        self.read_only_view = read_only_view;
        self
    }

    #[must_use]
    pub const fn always_accessible(mut self) -> Self {
        self.always_accessible = true;
        self
    }
}

/// A location resolved against the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: RouteDescriptor,
    pub params: BTreeMap<String, String>,
    /// Path without the query string.
    pub path: String,
    /// Path plus query string, exactly as requested.
    pub full_path: String,
}

impl RouteMatch {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Value of a query parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        let (_, query) = self.full_path.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then(|| {
                urlencoding::decode(&value.replace('+', " ")).map_or_else(|_| value.to_owned(), |v| v.into_owned())
            })
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    /// The portal's routes.
    #[must_use]
    pub fn portal() -> Self {
        Self::new(vec![
            RouteDescriptor::new("Home", ROOT_PATH).guest_only(),
            RouteDescriptor::new("Login", LOGIN_PATH).guest_only(),
            RouteDescriptor::new("Register", REGISTER_PATH).guest_only(),
            RouteDescriptor::new("WaitingApproval", WAITING_APPROVAL_PATH).always_accessible(),
            RouteDescriptor::new("Dashboard", DASHBOARD_PATH).authenticated(),
            RouteDescriptor::new("Courses", "/courses").authenticated(),
            RouteDescriptor::new("CourseView", "/course/:id").authenticated(),
            RouteDescriptor::new("CourseViewEdit", "/course/:id/edit").teacher(Some("/course/:id")),
            RouteDescriptor::new("CourseEdit", "/courses/:id/edit").teacher(Some("/course/:id")),
            RouteDescriptor::new("Discussions", "/discussions").authenticated(),
            RouteDescriptor::new("Archive", "/archive").authenticated(),
            RouteDescriptor::new("Messages", "/messages").authenticated(),
            RouteDescriptor::new("AdminUsers", "/admin/users").admin(),
        ])
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Match `location` (path with optional query) against the table, first
    /// declared route wins. `None` means the catch-all applies.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Option<RouteMatch> {
        let full_path = normalize_location(location);
        let path = full_path.split_once('?').map_or(full_path.as_str(), |(p, _)| p);
        let path = trim_path(path);

        self.routes.iter().find_map(|route| {
            match_pattern(route.path, path).map(|params| RouteMatch {
                route: *route,
                params,
                path: path.to_owned(),
                full_path: full_path.clone(),
            })
        })
    }
}

fn normalize_location(location: &str) -> String {
    let location = location.trim();
    if location.starts_with('/') {
        location.to_owned()
    } else {
        format!("/{location}")
    }
}

fn trim_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { ROOT_PATH } else { trimmed }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    let mut wanted = segments(pattern);
    let mut actual = segments(path);
    loop {
        match (wanted.next(), actual.next()) {
            (None, None) => return Some(params),
            (Some(w), Some(a)) => {
                if let Some(name) = w.strip_prefix(':') {
                    params.insert(name.to_owned(), a.to_owned());
                } else if w != a {
                    return None;
                }
            }
            _ => return None,
        }
    }
}

/// Substitute `:param` segments of `pattern` from `params`. Returns `None`
/// when a parameter is missing.
#[must_use]
pub fn fill_pattern(pattern: &str, params: &BTreeMap<String, String>) -> Option<String> {
    let mut out = String::new();
    for segment in segments(pattern) {
        out.push('/');
        match segment.strip_prefix(':') {
            Some(name) => out.push_str(params.get(name)?),
            None => out.push_str(segment),
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    Some(out)
}

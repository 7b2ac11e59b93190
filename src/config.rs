//! Client configuration with environment overrides.
//!
//! The browser build uses [`ClientConfig::default`] (or a config assembled by
//! the embedding page); native tools call [`ClientConfig::from_env`].

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_PROFILE_TTL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every relative API path is joined onto (no trailing `/`).
    pub api_base_url: String,
    /// How long a cached profile is trusted before `init()` re-fetches it.
    pub profile_ttl: Duration,
    pub timeouts: HttpTimeouts,
    /// Upper bound on guard redirects followed for one navigation.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            profile_ttl: Duration::from_secs(DEFAULT_PROFILE_TTL_SECS),
            timeouts: HttpTimeouts::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Build a config for the given API base URL with all other values defaulted.
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self { api_base_url: normalize_base_url(base_url), ..Self::default() }
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `FENIX_API_BASE_URL`: default `http://localhost:8000/api`
    /// - `FENIX_PROFILE_TTL_SECS`: default 300
    /// - `FENIX_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FENIX_CONNECT_TIMEOUT_SECS`: default 10
    /// - `FENIX_MAX_REDIRECTS`: default 8
    ///
    /// Unparseable numbers fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("FENIX_API_BASE_URL")
            .map(|raw| normalize_base_url(&raw))
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned());

        Self {
            api_base_url,
            profile_ttl: Duration::from_secs(env_parse("FENIX_PROFILE_TTL_SECS", DEFAULT_PROFILE_TTL_SECS)),
            timeouts: HttpTimeouts {
                request_secs: env_parse("FENIX_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("FENIX_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            max_redirects: env_parse("FENIX_MAX_REDIRECTS", DEFAULT_MAX_REDIRECTS),
        }
    }

    /// Freshness window in milliseconds, saturating on absurd values.
    #[must_use]
    pub fn profile_ttl_ms(&self) -> i64 {
        i64::try_from(self.profile_ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

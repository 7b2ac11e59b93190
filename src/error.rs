//! Client error taxonomy.
//!
//! DESIGN
//! ======
//! One `Clone` enum covers every failure the session core can surface. Shared
//! single-flight futures hand the same result to every waiter, so the error
//! must be cloneable; transport errors are therefore captured as strings.
//!
//! Messages for validation/auth failures come from the response body when the
//! backend supplies one (`{"error": ...}` from the portal's exception handler,
//! or `{"detail": ...}` from framework-level validation).

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure: no HTTP response was received.
    #[error("network failure: {0}")]
    Network(String),

    /// The API rejected the credential (401) or the caller's privileges (403).
    #[error("authorization failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// A 4xx with a structured body, or any rejection from login/register/refresh.
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// The refresh token is missing, invalid or expired; the session was cleared.
    #[error("session expired: {0}")]
    RefreshExhausted(String),

    /// 5xx or any other unexpected status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A success response whose body did not match the expected shape.
    #[error("invalid response payload: {0}")]
    Decode(String),

    /// The durable storage backend could not be read or written.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl ClientError {
    /// Map a non-success response to an error.
    ///
    /// `auth_endpoint` marks login/register/refresh, whose 401/403 answers are
    /// user-facing credential problems rather than an expired session.
    #[must_use]
    pub fn from_status(status: u16, body: &str, auth_endpoint: bool) -> Self {
        let message = extract_message(body).unwrap_or_else(|| status_fallback_message(status));
        match status {
            401 | 403 if !auth_endpoint => Self::Auth { status, message },
            400..=499 => Self::Validation { status, message },
            _ => Self::Server { status, message },
        }
    }

    /// Stable machine-readable code for logs and UI branching.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E_NETWORK",
            Self::Auth { .. } => "E_AUTH",
            Self::Validation { .. } => "E_VALIDATION",
            Self::RefreshExhausted(_) => "E_REFRESH_EXHAUSTED",
            Self::Server { .. } => "E_SERVER",
            Self::Decode(_) => "E_DECODE",
            Self::Storage(_) => "E_STORAGE",
        }
    }

    /// Whether the failure means the user must sign in again.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::RefreshExhausted(_) | Self::Auth { status: 401, .. })
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull a human-readable message out of an error body.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return non_empty(error);
    }
    match value.get("detail")? {
        Value::String(detail) => non_empty(detail),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if parts.is_empty() { None } else { Some(parts.join("; ")) }
        }
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn status_fallback_message(status: u16) -> String {
    format!("request failed with status {status}")
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

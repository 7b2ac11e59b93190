//! Wire DTOs for the portal's auth and admin endpoints.
//!
//! DESIGN
//! ======
//! These types mirror the backend's JSON payloads. Optional profile fields are
//! defaulted so older or trimmed responses still decode; role and status are
//! closed enums because the guard branches on them.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// ROLE / STATUS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    DepartmentHead,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Teacher, Role::DepartmentHead, Role::Admin];

    /// Roles allowed into admin screens.
    #[must_use]
    pub fn is_admin_tier(self) -> bool {
        matches!(self, Self::Admin | Self::DepartmentHead)
    }

    /// Roles allowed to edit course material.
    #[must_use]
    pub fn is_teacher_tier(self) -> bool {
        matches!(self, Self::Teacher | Self::DepartmentHead | Self::Admin)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::DepartmentHead => "department_head",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Active,
    Rejected,
    Blocked,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 4] =
        [AccountStatus::Pending, AccountStatus::Active, AccountStatus::Rejected, AccountStatus::Blocked];

    /// Rejected and blocked accounts may not keep a session.
    #[must_use]
    pub fn is_locked_out(self) -> bool {
        matches!(self, Self::Rejected | Self::Blocked)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown account status: {s}"))
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// An account as returned by `/auth/me`, login, and the admin endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Study course; set for students only.
    #[serde(default)]
    pub course: Option<String>,
    /// Study group; set for students only.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub confirmed_at: Option<String>,
    /// Id of the administrator who approved or rejected the account.
    #[serde(default)]
    pub confirmed_by: Option<i64>,
}

impl UserProfile {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin_tier()
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Name for greetings; falls back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or(&self.email)
    }
}

// =============================================================================
// AUTH PAYLOADS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: email.trim().to_owned(), password: password.to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl RegisterRequest {
    /// Check the payload against the backend's registration rules.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] (status 400) describing the first
    /// rule the payload breaks.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !looks_like_email(&self.email) {
            return Err(invalid("Invalid email format"));
        }
        if self.full_name.trim().is_empty() {
            return Err(invalid("Full name is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("Password must be at least 6 characters"));
        }
        if self.role == Role::Student {
            if blank(self.course.as_deref()) {
                return Err(invalid("Students must specify a course"));
            }
            if blank(self.group.as_deref()) {
                return Err(invalid("Students must specify a group"));
            }
        }
        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().rsplit_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn invalid(message: &str) -> ClientError {
    ClientError::Validation { status: 400, message: message.to_owned() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body of login, register and refresh responses.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

/// What registration hands back to the caller. Tokens issued alongside a
/// pending account are deliberately not kept.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RegisteredAccount {
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Body of `GET /auth/check-status`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AccountStatusReport {
    pub status: AccountStatus,
    #[serde(default)]
    pub message: String,
    pub user: UserProfile,
}

// =============================================================================
// ADMIN PAYLOADS
// =============================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Query for `GET /admin/users`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserFilter {
    pub status: Option<AccountStatus>,
    pub role: Option<Role>,
    pub page: u32,
    pub limit: u32,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self { status: None, role: None, page: 1, limit: DEFAULT_PAGE_LIMIT }
    }
}

impl UserFilter {
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(4);
        if let Some(status) = self.status {
            query.push(("status".to_owned(), status.as_str().to_owned()));
        }
        if let Some(role) = self.role {
            query.push(("role".to_owned(), role.as_str().to_owned()));
        }
        query.push(("page".to_owned(), self.page.max(1).to_string()));
        query.push(("limit".to_owned(), self.limit.max(1).to_string()));
        query
    }
}

/// One page of accounts.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: AccountStatus,
}

/// Response of the status-changing admin endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct StatusChange {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

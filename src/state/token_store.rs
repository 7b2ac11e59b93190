//! Durable mirror of the session's tokens and cached profile.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager is the only writer. It writes the whole group through
//! on every mutation (login, refresh, profile fetch) and clears the whole
//! group on logout; it reads the group once, at bootstrap.
//!
//! Persisted keys: `access_token`, `refresh_token`, `user` (JSON), and
//! `isAuthenticated`. The `user` entry carries the time the profile was last
//! confirmed by the server so bootstrap can decide whether to trust it.

#[cfg(test)]
#[path = "token_store_test.rs"]
mod token_store_test;

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::storage::StorageBackend;
use crate::error::ClientError;
use crate::net::types::UserProfile;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_KEY: &str = "user";
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

pub const PERSISTED_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY, AUTH_FLAG_KEY];

/// A profile as last confirmed by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedProfile {
    pub user: UserProfile,
    /// `None` for entries written without a timestamp; those are always stale.
    pub checked_at_ms: Option<i64>,
}

/// Everything the store holds, as read at bootstrap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersistedSession {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub profile: Option<CachedProfile>,
}

#[derive(Serialize)]
struct StampedProfileRef<'a> {
    user: &'a UserProfile,
    checked_at_ms: i64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredProfile {
    Stamped { user: UserProfile, checked_at_ms: i64 },
    Bare(UserProfile),
}

#[derive(Clone)]
pub struct TokenStore {
    backend: Rc<dyn StorageBackend>,
}

impl TokenStore {
    #[must_use]
    pub fn new(backend: Rc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Read the persisted group. Corrupt profile data is removed and
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Storage`] only when the backend itself fails.
    pub fn load(&self) -> Result<PersistedSession, ClientError> {
        let access_token = self.read_token(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.read_token(REFRESH_TOKEN_KEY)?;
        let profile = match self.backend.get(USER_KEY)? {
            Some(raw) => self.decode_profile(&raw),
            None => None,
        };
        Ok(PersistedSession { access_token, refresh_token, profile })
    }

    fn read_token(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self
            .backend
            .get(key)?
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty() && t != "null" && t != "undefined"))
    }

    fn decode_profile(&self, raw: &str) -> Option<CachedProfile> {
        match serde_json::from_str::<StoredProfile>(raw) {
            Ok(StoredProfile::Stamped { user, checked_at_ms }) => {
                Some(CachedProfile { user, checked_at_ms: Some(checked_at_ms) })
            }
            Ok(StoredProfile::Bare(user)) => Some(CachedProfile { user, checked_at_ms: None }),
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt cached profile");
                if let Err(err) = self.backend.remove(USER_KEY) {
                    tracing::warn!(error = %err, "failed to remove corrupt cached profile");
                }
                None
            }
        }
    }

    /// Write the full group: both tokens, the stamped profile, and the
    /// authentication flag. On a partial failure the group is cleared so a
    /// reload never sees a half-written session.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError::Storage`] encountered.
    pub fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        user: &UserProfile,
        checked_at_ms: i64,
    ) -> Result<(), ClientError> {
        let profile = serde_json::to_string(&StampedProfileRef { user, checked_at_ms })
            .map_err(|e| ClientError::Storage(e.to_string()))?;

        let result = self
            .backend
            .set(ACCESS_TOKEN_KEY, access_token)
            .and_then(|()| self.backend.set(REFRESH_TOKEN_KEY, refresh_token))
            .and_then(|()| self.backend.set(USER_KEY, &profile))
            .and_then(|()| self.backend.set(AUTH_FLAG_KEY, "true"));

        self.rollback_on_error(result)
    }

    /// Write the token pair and the authentication flag, leaving any cached
    /// profile in place. Used when tokens rotate before a profile is known.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError::Storage`] encountered.
    pub fn save_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), ClientError> {
        let result = self
            .backend
            .set(ACCESS_TOKEN_KEY, access_token)
            .and_then(|()| self.backend.set(REFRESH_TOKEN_KEY, refresh_token))
            .and_then(|()| self.backend.set(AUTH_FLAG_KEY, "true"));
        self.rollback_on_error(result)
    }

    fn rollback_on_error(&self, result: Result<(), ClientError>) -> Result<(), ClientError> {
        if let Err(err) = result {
            tracing::warn!(error = %err, "session write failed; clearing persisted session");
            if let Err(clear_err) = self.clear() {
                tracing::warn!(error = %clear_err, "failed to clear partially written session");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Remove every persisted key, attempting all of them.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError::Storage`] encountered.
    pub fn clear(&self) -> Result<(), ClientError> {
        let mut first_error = None;
        for key in PERSISTED_KEYS {
            if let Err(err) = self.backend.remove(key) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

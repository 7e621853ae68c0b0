//! Bearer-token lifecycle with lazy renewal
//!
//! The lease is estimated client-side: a successful login is assumed to be
//! good for [`TOKEN_LEASE_MINUTES`], regardless of what the server issues.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::AuthenticationError;

/// Fixed client-side token lease
pub const TOKEN_LEASE_MINUTES: i64 = 60;

/// Performs the login call and returns a fresh bearer token
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> Result<String, AuthenticationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Holds at most one session; refreshed in place, never persisted
#[derive(Debug, Default)]
pub struct TokenCache {
    session: Option<Session>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Return a token valid at `now`, logging in first if none is held or the
    /// held one has expired. A failed login leaves the previous state untouched.
    pub async fn ensure_valid(
        &mut self,
        now: DateTime<Utc>,
        authenticator: &dyn Authenticator,
    ) -> Result<String, AuthenticationError> {
        if let Some(session) = &self.session {
            if session.is_valid_at(now) {
                debug!(expires_at = %session.expires_at, "Reusing cached token");
                return Ok(session.token.clone());
            }
            info!(expired_at = %session.expires_at, "Token expired, logging in again");
        } else {
            info!("No token held, logging in");
        }

        let token = authenticator.login().await?;
        if token.is_empty() {
            return Err(AuthenticationError::MissingToken);
        }

        let session = Session {
            token: token.clone(),
            expires_at: now + Duration::minutes(TOKEN_LEASE_MINUTES),
        };
        debug!(expires_at = %session.expires_at, "Token refreshed");
        self.session = Some(session);

        Ok(token)
    }
}

//! Bearer tokens for Google Cloud calls.
//!
//! Obtaining a token is the caller's business (for example
//! `gcloud auth print-access-token`, or a workload identity sidecar). The
//! transport only asks a [`TokenSource`] for the current value.

use chrono::{DateTime, Duration, Utc};
use genmedia_jobs::config::with_config_key;
use genmedia_jobs::error::ConfigError;
use genmedia_jobs::TransportError;
use log::debug;
use std::sync::Mutex;

pub const ACCESS_TOKEN_ENV_VAR: &str = "GOOGLE_ACCESS_TOKEN";

/// Tokens are refreshed this long before they expire.
const EXPIRY_SKEW_SECS: i64 = 60;

pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, TransportError>;
}

#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        with_config_key(ACCESS_TOKEN_ENV_VAR, Err, |token| Ok(Self(token)))
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String, TransportError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_SKEW_SECS) > now
    }
}

/// Caches the token produced by `refresh` until shortly before it expires.
///
/// Concurrent callers serialize on the cache lock, so only one of them
/// refreshes an expired token.
pub struct CachedToken<F> {
    refresh: F,
    current: Mutex<Option<AuthToken>>,
}

impl<F> CachedToken<F>
where
    F: Fn() -> Result<AuthToken, TransportError> + Send + Sync,
{
    pub fn new(refresh: F) -> Self {
        Self {
            refresh,
            current: Mutex::new(None),
        }
    }
}

impl<F> TokenSource for CachedToken<F>
where
    F: Fn() -> Result<AuthToken, TransportError> + Send + Sync,
{
    fn access_token(&self) -> Result<String, TransportError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| TransportError::Auth("token cache lock poisoned".to_string()))?;

        if let Some(token) = current.as_ref().filter(|token| token.is_fresh(Utc::now())) {
            return Ok(token.access_token.clone());
        }

        debug!("Refreshing access token");
        let token = (self.refresh)().map_err(|err| match err {
            TransportError::Auth(message) => TransportError::Auth(message),
            other => TransportError::Auth(format!("token refresh failed: {other}")),
        })?;
        let access_token = token.access_token.clone();
        *current = Some(token);
        Ok(access_token)
    }
}

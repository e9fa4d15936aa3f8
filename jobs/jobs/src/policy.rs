use crate::config::{get_poll_interval_secs, get_poll_max_attempts};
use crate::error::{ConfigError, PolicyError};
use std::num::NonZeroU32;
use std::time::Duration;

/// Fixed-interval polling bounded by a number of status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: NonZeroU32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self, PolicyError> {
        let max_attempts = NonZeroU32::new(max_attempts).ok_or(PolicyError::ZeroAttempts)?;
        Ok(Self {
            interval,
            max_attempts,
        })
    }

    /// Reads `GENMEDIA_POLL_INTERVAL_SECS` and `GENMEDIA_POLL_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let interval = Duration::from_secs(get_poll_interval_secs()?);
        let max_attempts = get_poll_max_attempts()?;
        Self::new(interval, max_attempts).map_err(|_| ConfigError::Invalid {
            key: crate::config::POLL_MAX_ATTEMPTS_ENV_VAR.to_string(),
            value: max_attempts.to_string(),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    /// Upper bound on the time spent pausing between checks.
    pub fn max_wait(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts.get())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::config::DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: NonZeroU32::new(crate::config::DEFAULT_POLL_MAX_ATTEMPTS)
                .unwrap_or(NonZeroU32::MIN),
        }
    }
}

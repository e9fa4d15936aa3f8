use crate::error::ConfigError;
use std::ffi::OsStr;
use std::str::FromStr;

pub const POLL_INTERVAL_ENV_VAR: &str = "GENMEDIA_POLL_INTERVAL_SECS";
pub const POLL_MAX_ATTEMPTS_ENV_VAR: &str = "GENMEDIA_POLL_MAX_ATTEMPTS";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 60;

/// Loads a `.env` file from the working directory, if there is one.
pub fn load_env_file() {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }
}

pub fn with_config_key<R>(
    key: impl AsRef<OsStr>,
    fail: impl FnOnce(ConfigError) -> R,
    succeed: impl FnOnce(String) -> R,
) -> R {
    let key_str = key.as_ref().to_string_lossy().to_string();
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => succeed(value),
        _ => fail(ConfigError::Missing(key_str)),
    }
}

pub fn get_config_key(key: impl AsRef<OsStr>) -> Result<String, ConfigError> {
    with_config_key(key, Err, Ok)
}

pub fn get_optional_config(key: impl AsRef<OsStr>) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

pub fn get_config_with_default(key: impl AsRef<OsStr>, default: impl Into<String>) -> String {
    get_optional_config(key).unwrap_or_else(|| default.into())
}

/// Parses an optional numeric key; a present but malformed value is an error, not the default.
pub fn get_parsed_config<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match get_optional_config(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

pub fn get_poll_interval_secs() -> Result<u64, ConfigError> {
    get_parsed_config(POLL_INTERVAL_ENV_VAR, DEFAULT_POLL_INTERVAL_SECS)
}

pub fn get_poll_max_attempts() -> Result<u32, ConfigError> {
    get_parsed_config(POLL_MAX_ATTEMPTS_ENV_VAR, DEFAULT_POLL_MAX_ATTEMPTS)
}

//! Retry policy configuration as it arrives from outside the process.
//!
//! Fields are signed so that bad input (e.g. `-1`) is observable and rejected
//! with [`ConfigError`] instead of silently wrapping.

use std::time::Duration;

use serde::Deserialize;

use crate::descriptor::RetryPolicy;
use crate::error::ConfigError;

/// Raw retry settings, loadable from any serde source or the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicyConfig {
    pub timeout_ms: i64,
    pub error_limit: i64,
    pub timeout_limit: i64,
}

impl RetryPolicyConfig {
    /// Read `{PREFIX}_RETRY_TIMEOUT_MS`, `{PREFIX}_RETRY_ERROR_LIMIT` and
    /// `{PREFIX}_RETRY_TIMEOUT_LIMIT`. Missing variables count as zero.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |suffix: &str| -> Result<i64, ConfigError> {
            let key = format!("{prefix}_{suffix}");
            match lookup(&key) {
                None => Ok(0),
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Unparsable {
                    key,
                    value: raw.clone(),
                }),
            }
        };

        Ok(Self {
            timeout_ms: read("RETRY_TIMEOUT_MS")?,
            error_limit: read("RETRY_ERROR_LIMIT")?,
            timeout_limit: read("RETRY_TIMEOUT_LIMIT")?,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::Negative { field, value })
}

fn limit(field: &'static str, value: i64) -> Result<u32, ConfigError> {
    let value_u64 = non_negative(field, value)?;
    u32::try_from(value_u64).map_err(|_| ConfigError::OutOfRange { field, value })
}

impl TryFrom<RetryPolicyConfig> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(config: RetryPolicyConfig) -> Result<Self, Self::Error> {
        Ok(RetryPolicy {
            timeout: Duration::from_millis(non_negative("timeout_ms", config.timeout_ms)?),
            error_limit: limit("error_limit", config.error_limit)?,
            timeout_limit: limit("timeout_limit", config.timeout_limit)?,
        })
    }
}

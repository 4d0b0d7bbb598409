//! Job descriptors: a handler binding plus the retry policy that governs it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RetryPolicyConfig;
use crate::error::ConfigError;
use crate::handler::HandlerBinding;

/// Retry policy applied by the scheduler to one job type.
///
/// All fields default to zero: no timeout, no retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// How long one execution may run before it counts as timed out.
    pub timeout: Duration,
    /// Retries allowed after the handler reports an error.
    pub error_limit: u32,
    /// Retries allowed after an execution times out.
    pub timeout_limit: u32,
}

/// Configuration record for a job type.
///
/// Built once at startup, configured through the chained `with_*` calls
/// (last write wins) and then handed to the registry, which makes it
/// read-only.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    handler: HandlerBinding,
    policy: RetryPolicy,
}

impl JobDescriptor {
    pub fn new(handler: HandlerBinding) -> Self {
        Self {
            handler,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    pub fn with_retry_error_limit(mut self, limit: u32) -> Self {
        self.policy.error_limit = limit;
        self
    }

    pub fn with_retry_timeout_limit(mut self, limit: u32) -> Self {
        self.policy.timeout_limit = limit;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply externally loaded settings, rejecting invalid values.
    pub fn configure(self, config: &RetryPolicyConfig) -> Result<Self, ConfigError> {
        let policy = RetryPolicy::try_from(config.clone())?;
        Ok(self.with_policy(policy))
    }

    pub fn handler(&self) -> &HandlerBinding {
        &self.handler
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn retry_timeout(&self) -> Duration {
        self.policy.timeout
    }

    pub fn retry_error_limit(&self) -> u32 {
        self.policy.error_limit
    }

    pub fn retry_timeout_limit(&self) -> u32 {
        self.policy.timeout_limit
    }
}

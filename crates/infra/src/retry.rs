//! Retry decisions for an external scheduler.
//!
//! The scheduler owns the attempt counters and the requeue; this module only
//! maps (policy, failure, attempts so far) to "retry" or "give up", so the
//! structural/business split is applied the same way everywhere.

use serde::{Deserialize, Serialize};

use jobsd_core::RetryPolicy;

use crate::registry::RegistryError;

/// What went wrong with one execution.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The dispatch returned an error.
    Error(&'a RegistryError),
    /// The execution exceeded the policy's timeout.
    TimedOut,
}

/// Retries already spent on a job, per failure class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempts {
    pub errors: u32,
    pub timeouts: u32,
}

impl Attempts {
    /// Count one more retry of the given failure.
    pub fn record(&mut self, failure: &Failure<'_>) {
        match failure {
            Failure::Error(_) => self.errors += 1,
            Failure::TimedOut => self.timeouts += 1,
        }
    }
}

/// Why a job will not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiveUpReason {
    /// Retrying cannot fix it (bad shape, corrupt args, unknown job).
    Structural,
    ErrorLimitReached,
    TimeoutLimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryDecision {
    Retry,
    GiveUp(GiveUpReason),
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry)
    }
}

/// Decide whether a failed execution should be retried.
pub fn decide(policy: &RetryPolicy, failure: &Failure<'_>, attempts: Attempts) -> RetryDecision {
    match failure {
        Failure::Error(err) if !err.is_retryable() => RetryDecision::GiveUp(GiveUpReason::Structural),
        Failure::Error(_) if attempts.errors < policy.error_limit => RetryDecision::Retry,
        Failure::Error(_) => RetryDecision::GiveUp(GiveUpReason::ErrorLimitReached),
        Failure::TimedOut if attempts.timeouts < policy.timeout_limit => RetryDecision::Retry,
        Failure::TimedOut => RetryDecision::GiveUp(GiveUpReason::TimeoutLimitReached),
    }
}

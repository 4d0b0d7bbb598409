//! Job error model.
//!
//! Failures fall into two families:
//!
//! - **Structural**: the invocation mechanism itself is broken (bad handler
//!   shape, corrupt persisted arguments, invalid policy). Retrying cannot help.
//! - **Business**: the bound callable ran and reported its own failure. This is
//!   the only family an external scheduler should spend retry budget on.

use thiserror::Error;

use crate::value::ArgKind;

/// Boxed error produced by a bound callable.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used across the job layer.
pub type JobResult<T> = Result<T, JobError>;

/// Any failure produced by binding, encoding, decoding or executing a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("handler shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("job failed: {0}")]
    Business(#[from] BusinessError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl JobError {
    /// True for failures that no amount of retrying can fix.
    pub fn is_structural(&self) -> bool {
        !self.is_retryable()
    }

    /// Only business failures are eligible for the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, JobError::Business(_))
    }

    /// The callable's own error, if this is a business failure.
    pub fn as_business(&self) -> Option<&BusinessError> {
        match self {
            JobError::Business(e) => Some(e),
            _ => None,
        }
    }
}

/// Registration/enqueue-time mismatch between a handler and its arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("handler must return exactly one value, declares {found}")]
    ReturnArity { found: usize },

    #[error("handler return type must be an error outcome, found {found}")]
    ReturnNotOutcome { found: ArgKind },

    #[error("handler takes {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("argument {index}: handler expects {expected}, got {found}")]
    KindMismatch {
        index: usize,
        expected: ArgKind,
        found: ArgKind,
    },
}

/// Execute-time failure of the invocation mechanism.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("handler takes {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("argument {index} ({found}) cannot be converted to the declared {expected} parameter")]
    ArgumentMismatch {
        index: usize,
        expected: ArgKind,
        found: ArgKind,
    },

    #[error("handler returned {found} value(s), expected exactly one")]
    ReturnArity { found: usize },

    #[error("handler returned a {found} value where an error outcome was expected")]
    ReturnNotOutcome { found: ArgKind },

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// The error value returned by the bound callable itself.
///
/// The original value is kept intact so callers can downcast to it.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BusinessError(BoxError);

impl BusinessError {
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }

    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Persisted argument list could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed argument encoding: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported argument format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Argument list contains a value the persisted format cannot round-trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("non-finite float at {path}")]
    NonFiniteFloat { path: String },

    #[error("value at {path} nests deeper than {limit} levels")]
    TooDeep { path: String, limit: usize },

    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Invalid retry policy configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} is out of range (got {value})")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("{key}: cannot parse {value:?} as an integer")]
    Unparsable { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("smtp unavailable")]
    struct SmtpDown;

    #[test]
    fn only_business_failures_are_retryable() {
        let business = JobError::from(BusinessError::new(SmtpDown));
        assert!(business.is_retryable());
        assert!(!business.is_structural());

        let shape = JobError::from(ShapeError::ReturnArity { found: 2 });
        let invocation = JobError::from(InvocationError::Panicked("boom".into()));
        let config = JobError::from(ConfigError::Negative {
            field: "retry_error_limit",
            value: -1,
        });
        for err in [shape, invocation, config] {
            assert!(err.is_structural(), "{err} should be structural");
        }
    }

    #[test]
    fn business_error_keeps_the_original_value() {
        let err = BusinessError::new(SmtpDown);
        assert_eq!(err.downcast_ref::<SmtpDown>(), Some(&SmtpDown));
        assert_eq!(err.to_string(), "smtp unavailable");
    }

    #[test]
    fn messages_name_the_offending_argument() {
        let err = ShapeError::KindMismatch {
            index: 1,
            expected: ArgKind::Int,
            found: ArgKind::Str,
        };
        assert_eq!(err.to_string(), "argument 1: handler expects int, got string");
    }
}

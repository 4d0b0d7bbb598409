//! `jobsd-core`: typed job handlers, argument lists and retry policy.
//!
//! This crate is pure: no storage, no scheduling loop, no threads of its own.
//! Callers bind a function into a [`HandlerBinding`], wrap it in a
//! [`JobDescriptor`] with a [`RetryPolicy`], persist invocation arguments as an
//! [`ArgumentList`], and later execute the binding against the decoded list.

pub mod args;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod handler;
pub mod id;
pub mod value;

pub use args::{ArgumentList, FORMAT_VERSION};
pub use config::RetryPolicyConfig;
pub use descriptor::{JobDescriptor, RetryPolicy};
pub use error::{
    BoxError, BusinessError, ConfigError, DecodeError, EncodeError, InvocationError, JobError,
    JobResult, ShapeError,
};
pub use handler::{HandlerBinding, IntoJobFn, IntoOutcome, JobFn, ReturnKind, Returned, Signature};
pub use id::{InvalidId, JobId, JobName};
pub use value::{ArgKind, ArgValue, FromArg, MAX_NESTING};

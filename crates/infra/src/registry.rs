//! Named job registry: registration, enqueue preparation and dispatch.
//!
//! The registry is built during startup with `&mut self` registration and
//! then shared read-only (typically behind an `Arc`) by every worker. It
//! holds no locks; concurrent dispatches only share the handler bindings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use jobsd_core::{ArgumentList, InvalidId, JobDescriptor, JobError, JobId, JobName};

/// Registry-level failure.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("job already registered: {0}")]
    AlreadyRegistered(JobName),

    #[error("unknown job: {0}")]
    UnknownJob(String),

    #[error(transparent)]
    InvalidName(#[from] InvalidId),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl RegistryError {
    /// Only the callable's own failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Job(e) if e.is_retryable())
    }

    pub fn as_job_error(&self) -> Option<&JobError> {
        match self {
            RegistryError::Job(e) => Some(e),
            _ => None,
        }
    }
}

/// A validated, encoded invocation ready to be written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparedJob {
    pub id: JobId,
    pub name: JobName,
    /// Stored argument column; `None` when the job takes no arguments.
    pub args: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Job types known to this process, keyed by name.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: HashMap<JobName, JobDescriptor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job type.
    ///
    /// The handler's return shape is checked here so a malformed handler never
    /// becomes schedulable.
    #[instrument(skip_all, fields(job = %name))]
    pub fn register(&mut self, name: &str, descriptor: JobDescriptor) -> Result<(), RegistryError> {
        let name = JobName::new(name)?;
        if self.jobs.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        descriptor
            .handler()
            .validate_signature()
            .map_err(JobError::from)?;

        info!(
            params = descriptor.handler().parameter_count(),
            retry_timeout = ?descriptor.retry_timeout(),
            retry_error_limit = descriptor.retry_error_limit(),
            retry_timeout_limit = descriptor.retry_timeout_limit(),
            "job registered"
        );
        self.jobs.insert(name, descriptor);
        Ok(())
    }

    /// Remove a job type; returns its descriptor if it was registered.
    pub fn unregister(&mut self, name: &str) -> Option<JobDescriptor> {
        let name = JobName::new(name).ok()?;
        self.jobs.remove(&name)
    }

    pub fn get(&self, name: &str) -> Option<&JobDescriptor> {
        let name = JobName::new(name).ok()?;
        self.jobs.get(&name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&JobName> {
        let mut names: Vec<_> = self.jobs.keys().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn descriptor(&self, name: &str) -> Result<&JobDescriptor, RegistryError> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownJob(name.to_string()))
    }

    /// Fully validate `args` against the job's handler and encode them.
    #[instrument(skip_all, fields(job = %name, args = args.len()))]
    pub fn prepare(&self, name: &str, args: &ArgumentList) -> Result<PreparedJob, RegistryError> {
        let descriptor = self.descriptor(name)?;
        descriptor
            .handler()
            .validate(args)
            .map_err(JobError::from)?;
        let encoded = args.encode().map_err(JobError::from)?;

        let prepared = PreparedJob {
            id: JobId::new(),
            name: JobName::new(name)?,
            args: encoded,
            created_at: Utc::now(),
        };
        debug!(job_id = %prepared.id, "job prepared");
        Ok(prepared)
    }

    /// Decode stored arguments and run the job's handler.
    ///
    /// Decode failures and invocation failures come back as structural
    /// errors; only the handler's own error is retryable.
    #[instrument(skip_all, fields(job = %name))]
    pub fn dispatch(&self, name: &str, stored: Option<&str>) -> Result<(), RegistryError> {
        let descriptor = self.descriptor(name)?;
        let args = ArgumentList::decode(stored).map_err(JobError::from)?;

        match descriptor.handler().execute(&args) {
            Ok(()) => {
                debug!("job succeeded");
                Ok(())
            }
            Err(err) if err.is_retryable() => {
                warn!(error = %err, "job returned an error");
                Err(err.into())
            }
            Err(err) => {
                warn!(error = %err, "job failed structurally");
                Err(err.into())
            }
        }
    }

    /// Run a prepared job directly (e.g. inline execution without storage).
    pub fn dispatch_prepared(&self, job: &PreparedJob) -> Result<(), RegistryError> {
        self.dispatch(job.name.as_str(), job.args.as_deref())
    }
}

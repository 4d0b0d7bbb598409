//! Strongly-typed identifiers for job types and queued jobs.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted job name, in bytes.
pub const MAX_JOB_NAME_LEN: usize = 128;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidId {
    #[error("job name must not be empty")]
    EmptyName,

    #[error("job name {0:?} has surrounding whitespace")]
    Whitespace(String),

    #[error("job name is longer than {} bytes", MAX_JOB_NAME_LEN)]
    TooLong,

    #[error("job name {0:?} contains control characters")]
    ControlCharacters(String),

    #[error("invalid job id: {0}")]
    Uuid(#[from] uuid::Error),
}

/// Name a job type is registered under (e.g. `send-email`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobName(String);

impl JobName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidId> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidId::EmptyName);
        }
        if name.trim() != name {
            return Err(InvalidId::Whitespace(name));
        }
        if name.len() > MAX_JOB_NAME_LEN {
            return Err(InvalidId::TooLong);
        }
        if name.chars().any(char::is_control) {
            return Err(InvalidId::ControlCharacters(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for JobName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobName {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for JobName {
    type Error = InvalidId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for JobName {
    type Error = InvalidId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<JobName> for String {
    fn from(value: JobName) -> Self {
        value.0
    }
}

/// Identifier of one queued invocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered), so ids sort in enqueue order.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for JobId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for JobId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_names_are_validated() {
        assert!(JobName::new("send-email").is_ok());
        assert_eq!(JobName::new(""), Err(InvalidId::EmptyName));
        assert!(matches!(JobName::new(" send"), Err(InvalidId::Whitespace(_))));
        assert!(matches!(
            JobName::new("send\nemail"),
            Err(InvalidId::ControlCharacters(_))
        ));
        assert_eq!(
            JobName::new("x".repeat(MAX_JOB_NAME_LEN + 1)),
            Err(InvalidId::TooLong)
        );
    }

    #[test]
    fn job_names_deserialize_through_validation() {
        let name: JobName = serde_json::from_str(r#""send-email""#).unwrap();
        assert_eq!(name.as_str(), "send-email");
        assert!(serde_json::from_str::<JobName>(r#""""#).is_err());
    }

    #[test]
    fn job_ids_round_trip_through_strings() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }
}

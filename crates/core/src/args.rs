//! Argument lists and their persisted representation.
//!
//! ## Format
//!
//! A non-empty list is stored as a versioned JSON document:
//!
//! ```text
//! {"v":1,"args":[{"str":"a@example.com"},{"int":0}]}
//! ```
//!
//! An empty list has no stored representation at all (`None`, i.e. SQL `NULL`),
//! so "job takes no arguments" is never confused with an empty encoding.
//! Values outside the encodable set (non-finite floats, containers nested
//! past [`MAX_NESTING`]) are rejected when encoding, before anything reaches
//! storage.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use crate::value::{ArgKind, ArgValue, MAX_NESTING};

/// Current persisted format version.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    args: &'a [ArgValue],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    v: u32,
    args: Vec<ArgValue>,
}

/// Ordered parameters for one job invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentList(Vec<ArgValue>);

impl ArgumentList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an argument (builder style).
    pub fn with(mut self, value: impl Into<ArgValue>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn push(&mut self, value: impl Into<ArgValue>) {
        self.0.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArgValue> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ArgValue] {
        &self.0
    }

    pub fn kinds(&self) -> Vec<ArgKind> {
        self.0.iter().map(ArgValue::kind).collect()
    }

    pub fn into_inner(self) -> Vec<ArgValue> {
        self.0
    }

    /// Produce the stored representation; `None` for an empty list.
    pub fn encode(&self) -> Result<Option<String>, EncodeError> {
        if self.0.is_empty() {
            return Ok(None);
        }

        for (i, value) in self.0.iter().enumerate() {
            let mut path = format!("args[{i}]");
            if value.find_too_deep(MAX_NESTING, &mut path) {
                return Err(EncodeError::TooDeep {
                    path,
                    limit: MAX_NESTING,
                });
            }
            if value.find_non_finite(&mut path) {
                return Err(EncodeError::NonFiniteFloat { path });
            }
        }

        let envelope = EnvelopeRef {
            v: FORMAT_VERSION,
            args: &self.0,
        };
        serde_json::to_string(&envelope)
            .map(Some)
            .map_err(|e| EncodeError::Serialize(e.to_string()))
    }

    /// Rebuild a list from its stored representation; `None` is the empty list.
    pub fn decode(stored: Option<&str>) -> Result<Self, DecodeError> {
        let Some(raw) = stored else {
            return Ok(Self::new());
        };

        let envelope: Envelope = serde_json::from_str(raw)?;
        if envelope.v != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: envelope.v,
                supported: FORMAT_VERSION,
            });
        }
        Ok(Self(envelope.args))
    }
}

impl From<Vec<ArgValue>> for ArgumentList {
    fn from(values: Vec<ArgValue>) -> Self {
        Self(values)
    }
}

impl FromIterator<ArgValue> for ArgumentList {
    fn from_iter<I: IntoIterator<Item = ArgValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ArgumentList {
    type Item = ArgValue;
    type IntoIter = std::vec::IntoIter<ArgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ArgumentList {
    type Item = &'a ArgValue;
    type IntoIter = std::slice::Iter<'a, ArgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build an [`ArgumentList`] from anything convertible into [`ArgValue`].
///
/// ```
/// let args = jobsd_core::args!["a@example.com", 0];
/// assert_eq!(args.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::ArgumentList::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::ArgumentList::from(vec![$($crate::ArgValue::from($value)),+])
    };
}

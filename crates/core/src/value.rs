//! Argument values: the closed set of kinds a job invocation can carry.
//!
//! Every value stored in an [`ArgumentList`](crate::ArgumentList) is one of the
//! [`ArgValue`] variants. Handler parameters declare their kind through
//! [`FromArg::KIND`]; matching is done at kind level, so any signed integer
//! width accepts an [`ArgKind::Int`] value, any unsigned width an
//! [`ArgKind::Uint`], and so on. Narrowing is range-checked when the value is
//! converted for the call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Deepest container nesting (lists and maps) an argument may have.
pub const MAX_NESTING: usize = 32;

/// Kind tag of an [`ArgValue`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Int,
    Uint,
    Float,
    Bool,
    Str,
    List,
    Map,
}

impl ArgKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgKind::Int => "int",
            ArgKind::Uint => "uint",
            ArgKind::Float => "float",
            ArgKind::Bool => "bool",
            ArgKind::Str => "string",
            ArgKind::List => "list",
            ArgKind::Map => "map",
        }
    }
}

impl core::fmt::Display for ArgKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single job argument.
///
/// Serialized externally tagged by kind, e.g. `{"int":3}` or `{"str":"x"}`.
/// Maps are ordered so the persisted form is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Int(_) => ArgKind::Int,
            ArgValue::Uint(_) => ArgKind::Uint,
            ArgValue::Float(_) => ArgKind::Float,
            ArgValue::Bool(_) => ArgKind::Bool,
            ArgValue::Str(_) => ArgKind::Str,
            ArgValue::List(_) => ArgKind::List,
            ArgValue::Map(_) => ArgKind::Map,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ArgValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Path of the first non-finite float inside this value, if any.
    pub(crate) fn find_non_finite(&self, path: &mut String) -> bool {
        match self {
            ArgValue::Float(f) => !f.is_finite(),
            ArgValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{i}]"));
                    if item.find_non_finite(path) {
                        return true;
                    }
                    path.truncate(len);
                }
                false
            }
            ArgValue::Map(entries) => {
                for (key, item) in entries {
                    let len = path.len();
                    path.push_str(&format!(".{key}"));
                    if item.find_non_finite(path) {
                        return true;
                    }
                    path.truncate(len);
                }
                false
            }
            _ => false,
        }
    }

    /// True when containers nest more than `budget` levels deep; `path` then
    /// points at the first container past the limit.
    pub(crate) fn find_too_deep(&self, budget: usize, path: &mut String) -> bool {
        match self {
            ArgValue::List(_) | ArgValue::Map(_) if budget == 0 => true,
            ArgValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    let len = path.len();
                    path.push_str(&format!("[{i}]"));
                    if item.find_too_deep(budget - 1, path) {
                        return true;
                    }
                    path.truncate(len);
                }
                false
            }
            ArgValue::Map(entries) => {
                for (key, item) in entries {
                    let len = path.len();
                    path.push_str(&format!(".{key}"));
                    if item.find_too_deep(budget - 1, path) {
                        return true;
                    }
                    path.truncate(len);
                }
                false
            }
            _ => false,
        }
    }
}

/// Conversion from a stored argument into a handler parameter type.
pub trait FromArg: Sized {
    /// Kind this parameter type declares.
    const KIND: ArgKind;

    /// `None` when the value has the wrong kind or does not fit the type.
    fn from_arg(value: &ArgValue) -> Option<Self>;
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl FromArg for $t {
            const KIND: ArgKind = ArgKind::Int;

            fn from_arg(value: &ArgValue) -> Option<Self> {
                value.as_i64().and_then(|v| <$t>::try_from(v).ok())
            }
        }

        impl From<$t> for ArgValue {
            fn from(value: $t) -> Self {
                ArgValue::Int(value as i64)
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl FromArg for $t {
            const KIND: ArgKind = ArgKind::Uint;

            fn from_arg(value: &ArgValue) -> Option<Self> {
                value.as_u64().and_then(|v| <$t>::try_from(v).ok())
            }
        }

        impl From<$t> for ArgValue {
            fn from(value: $t) -> Self {
                ArgValue::Uint(value as u64)
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl FromArg for f64 {
    const KIND: ArgKind = ArgKind::Float;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl FromArg for f32 {
    const KIND: ArgKind = ArgKind::Float;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        let wide = f64::from_arg(value)?;
        let narrowed = wide as f32;
        (narrowed.is_finite() || !wide.is_finite()).then_some(narrowed)
    }
}

impl FromArg for bool {
    const KIND: ArgKind = ArgKind::Bool;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromArg for String {
    const KIND: ArgKind = ArgKind::Str;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl<T: FromArg> FromArg for Vec<T> {
    const KIND: ArgKind = ArgKind::List;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::List(items) => items.iter().map(T::from_arg).collect(),
            _ => None,
        }
    }
}

impl<T: FromArg> FromArg for BTreeMap<String, T> {
    const KIND: ArgKind = ArgKind::Map;

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Map(entries) => entries
                .iter()
                .map(|(k, v)| T::from_arg(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(value as f64)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_owned())
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(value: Vec<T>) -> Self {
        ArgValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>> From<BTreeMap<String, T>> for ArgValue {
    fn from(value: BTreeMap<String, T>) -> Self {
        ArgValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

//! Section payloads.
//!
//! Each top-level entry of a session file carries a payload whose shape is up
//! to the plugin that handles it. The payload is one of three shapes, and a
//! plugin matches the one it expects, failing with
//! [`LoadError::ConfigShape`] otherwise.

use crate::error::{LoadError, LoadResult};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Payload of one configuration section, passed to its plugin verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum Info {
    /// A single string, e.g. `hutch: xpp`
    Text(String),
    /// An ordered list, e.g. a list of module specifiers
    Sequence(Vec<Value>),
    /// A mapping, e.g. per-device settings
    Mapping(Mapping),
}

impl Info {
    /// Name of the payload shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Info::Text(_) => "string",
            Info::Sequence(_) => "sequence",
            Info::Mapping(_) => "mapping",
        }
    }

    /// The payload as a string.
    pub fn as_text(&self) -> LoadResult<&str> {
        match self {
            Info::Text(text) => Ok(text),
            other => Err(other.shape_error("string")),
        }
    }

    /// The payload as a sequence.
    pub fn as_sequence(&self) -> LoadResult<&[Value]> {
        match self {
            Info::Sequence(items) => Ok(items),
            other => Err(other.shape_error("sequence")),
        }
    }

    /// The payload as a mapping.
    pub fn as_mapping(&self) -> LoadResult<&Mapping> {
        match self {
            Info::Mapping(map) => Ok(map),
            other => Err(other.shape_error("mapping")),
        }
    }

    /// A string, or a sequence of strings, as a list of strings.
    pub fn string_list(&self) -> LoadResult<Vec<String>> {
        const EXPECTED: &str = "string or sequence of strings";
        match self {
            Info::Text(text) => Ok(vec![text.clone()]),
            Info::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(LoadError::ConfigShape {
                        expected: EXPECTED,
                        found: value_kind(other),
                    }),
                })
                .collect(),
            other => Err(other.shape_error(EXPECTED)),
        }
    }

    fn shape_error(&self, expected: &'static str) -> LoadError {
        LoadError::ConfigShape {
            expected,
            found: self.kind(),
        }
    }
}

impl TryFrom<Value> for Info {
    type Error = LoadError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Info::Text(text)),
            Value::Sequence(items) => Ok(Info::Sequence(items)),
            Value::Mapping(map) => Ok(Info::Mapping(map)),
            other => Err(LoadError::ConfigShape {
                expected: "string, sequence or mapping",
                found: value_kind(&other),
            }),
        }
    }
}

impl From<&str> for Info {
    fn from(text: &str) -> Self {
        Info::Text(text.to_string())
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

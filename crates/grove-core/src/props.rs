//! Plugin-defined per-file properties

use crate::error::{GraphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extension properties attached to a file, keyed by plugin-chosen names.
pub type Extensions = BTreeMap<String, PropValue>;

/// A value a plugin may store on a file.
///
/// Serialized with an explicit kind tag so byte buffers and timestamps
/// survive a JSON round trip unchanged. Numbers are JSON numbers, so NaN
/// and infinities cannot be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropValue {
    String(String),
    Number(serde_json::Number),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, PropValue>> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::String(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::String(value.to_string())
    }
}

impl TryFrom<f64> for PropValue {
    type Error = GraphError;

    fn try_from(value: f64) -> Result<Self> {
        serde_json::Number::from_f64(value)
            .map(PropValue::Number)
            .ok_or(GraphError::NonFiniteNumber(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value.into())
    }
}

impl From<u64> for PropValue {
    fn from(value: u64) -> Self {
        PropValue::Number(value.into())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Vec<u8>> for PropValue {
    fn from(value: Vec<u8>) -> Self {
        PropValue::Bytes(value)
    }
}

impl From<DateTime<Utc>> for PropValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropValue::Timestamp(value)
    }
}

impl From<BTreeMap<String, PropValue>> for PropValue {
    fn from(value: BTreeMap<String, PropValue>) -> Self {
        PropValue::Map(value)
    }
}

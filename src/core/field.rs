//! Field values used by the query layer

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A polymorphic field value that can hold the column types of the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Null,
}

impl FieldValue {
    /// Case-insensitive substring test; only strings can contain text
    pub fn contains_ignore_case(&self, needle: &str) -> bool {
        match self {
            FieldValue::String(s) => s.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        }
    }

    /// Total order used for sorting: nulls first, then integers, then strings
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Less,
            (_, FieldValue::Null) => Ordering::Greater,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Integer(_), FieldValue::String(_)) => Ordering::Less,
            (FieldValue::String(_), FieldValue::Integer(_)) => Ordering::Greater,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

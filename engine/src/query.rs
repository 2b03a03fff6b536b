//! Query predicates.
//!
//! Only two predicate forms exist: match everything, and single-field equality.
//! The reserved key [`RECORD_TYPE_KEY`] compares against a record's type tag instead of
//! its fields.

use crate::Record;
use serde::{Deserialize, Serialize};

/// Equality key that targets the record type rather than a field.
pub const RECORD_TYPE_KEY: &str = "recordType";

/// A filter over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Predicate {
    /// Accepts every record.
    All,
    /// Accepts records whose `key` equals `value`.
    Equals {
        key: String,
        value: serde_json::Value,
    },
}

impl Predicate {
    pub fn all() -> Self {
        Predicate::All
    }

    pub fn equals(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Predicate::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Shorthand for `recordType == record_type`.
    pub fn record_type(record_type: impl Into<String>) -> Self {
        let record_type: String = record_type.into();
        Self::equals(RECORD_TYPE_KEY, record_type)
    }

    /// Whether this predicate constrains the record type itself.
    pub fn constrains_record_type(&self) -> bool {
        matches!(self, Predicate::Equals { key, .. } if key == RECORD_TYPE_KEY)
    }

    pub fn accepts(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Equals { key, value } if key == RECORD_TYPE_KEY => {
                value.as_str() == Some(record.record_type.as_str())
            }
            Predicate::Equals { key, value } => record.get(key) == Some(value),
        }
    }
}

/// A record type plus a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
}

impl Query {
    pub fn new(record_type: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            record_type: record_type.into(),
            predicate,
        }
    }

    /// A query for every record of `record_type`.
    pub fn all_of(record_type: impl Into<String>) -> Self {
        Self::new(record_type, Predicate::All)
    }

    /// Whether `record` belongs in this query's results.
    ///
    /// A predicate on [`RECORD_TYPE_KEY`] replaces the query's own record-type filter.
    pub fn matches(&self, record: &Record) -> bool {
        if self.predicate.constrains_record_type() {
            return self.predicate.accepts(record);
        }
        record.record_type == self.record_type && self.predicate.accepts(record)
    }
}

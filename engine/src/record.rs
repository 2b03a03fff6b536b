//! Record types for storing data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field values are arbitrary JSON.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Identifier of a record, unique within one scope's store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// A fresh identifier backed by a random UUID.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for RecordId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A typed field map stored in a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier for this record
    pub id: RecordId,
    /// Type tag used by queries
    pub record_type: String,
    /// The record's fields
    #[serde(default)]
    pub fields: FieldMap,
}

impl Record {
    /// Create an empty record with a random identifier.
    pub fn new(record_type: impl Into<String>) -> Self {
        Self::with_id(RecordId::random(), record_type)
    }

    /// Create an empty record with the given identifier.
    pub fn with_id(id: impl Into<RecordId>, record_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type: record_type.into(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// A copy of this record restricted to `desired_keys`.
    ///
    /// `None` returns the full record. Requested keys the record does not have are
    /// simply absent from the copy.
    pub fn project(&self, desired_keys: Option<&[String]>) -> Record {
        let Some(keys) = desired_keys else {
            return self.clone();
        };
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| keys.iter().any(|k| k == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Record {
            id: self.id.clone(),
            record_type: self.record_type.clone(),
            fields,
        }
    }
}

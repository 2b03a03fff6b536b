//! Store - the in-memory record table of one scope.
//!
//! Records keep the position of their first insertion. Overwriting a record replaces it in
//! place, so scans and queries always observe insertion order.

use crate::{Query, Record, RecordId};
use std::collections::HashMap;

/// Insertion-ordered records, unique by identifier.
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    records: Vec<Record>,
    /// Position of each record in `records`.
    index: HashMap<RecordId, usize>,
}

impl RecordTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a single record.
    ///
    /// Returns `true` if the identifier was new.
    pub fn upsert(&mut self, record: Record) -> bool {
        match self.index.get(&record.id) {
            Some(&position) => {
                self.records[position] = record;
                false
            }
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
                true
            }
        }
    }

    /// Upsert every record in order.
    pub fn add_records(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.upsert(record);
        }
    }

    /// Get a record by ID.
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&position| &self.records[position])
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records for the given identifiers, in request order.
    ///
    /// Identifiers with no stored record are skipped.
    pub fn matching_ids<'a>(&'a self, ids: &'a [RecordId]) -> impl Iterator<Item = &'a Record> + 'a {
        ids.iter().filter_map(move |id| self.get(id))
    }

    /// Records accepted by `query`, in insertion order.
    pub fn matching_query<'a>(&'a self, query: &'a Query) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |record| query.matches(record))
    }

    /// Remove a single record, returning it if it was present.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let position = self.index.remove(id)?;
        let removed = self.records.remove(position);
        for record in &self.records[position..] {
            if let Some(slot) = self.index.get_mut(&record.id) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Remove every listed record. Absent identifiers are ignored.
    ///
    /// Returns the number of records actually removed.
    pub fn remove_records<'a>(&mut self, ids: impl IntoIterator<Item = &'a RecordId>) -> usize {
        ids.into_iter().filter(|id| self.remove(id).is_some()).count()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

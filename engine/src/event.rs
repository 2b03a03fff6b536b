//! Callback events emitted while an operation executes.
//!
//! An operation reports through one ordered stream of [`OperationEvent`]s instead of
//! independent callback slots. Per-item events come first, then exactly one aggregate
//! result, then [`OperationEvent::Completed`].

use crate::error::Result;
use crate::{Error, Record, RecordId};
use serde::{Deserialize, Serialize};

/// Continuation token for paged queries. The simulation never produces one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryCursor(String);

impl QueryCursor {
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// One callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationEvent {
    /// A record in the save batch was written, or failed.
    RecordSaved { id: RecordId, result: Result<Record> },
    /// Progress for a record in the save batch.
    SaveProgress { id: RecordId, progress: f64 },
    /// A record in the delete batch was removed, or failed.
    RecordDeleted { id: RecordId, result: Result<()> },
    /// A requested record was found.
    RecordFetched { id: RecordId, result: Result<Record> },
    /// Progress for a fetched record.
    FetchProgress { id: RecordId, progress: f64 },
    /// A record matched the query.
    RecordMatched { id: RecordId, result: Result<Record> },
    /// Aggregate outcome of a modify.
    ModifyFinished(Result<()>),
    /// Aggregate outcome of a fetch.
    FetchFinished(Result<()>),
    /// Aggregate outcome of a query; the cursor is always `None`.
    QueryFinished(Result<Option<QueryCursor>>),
    /// The operation is not one the engine models.
    Rejected(Error),
    /// Always the final event of a modelled operation.
    Completed,
}

impl OperationEvent {
    /// Whether this is a per-item event.
    pub fn is_item_event(&self) -> bool {
        matches!(
            self,
            OperationEvent::RecordSaved { .. }
                | OperationEvent::SaveProgress { .. }
                | OperationEvent::RecordDeleted { .. }
                | OperationEvent::RecordFetched { .. }
                | OperationEvent::FetchProgress { .. }
                | OperationEvent::RecordMatched { .. }
        )
    }

    /// The aggregate result carried by this event, with any cursor dropped.
    pub fn aggregate_result(&self) -> Option<Result<()>> {
        match self {
            OperationEvent::ModifyFinished(result) | OperationEvent::FetchFinished(result) => {
                Some(result.clone())
            }
            OperationEvent::QueryFinished(result) => Some(result.clone().map(|_| ())),
            _ => None,
        }
    }

    /// Short name, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            OperationEvent::RecordSaved { .. } => "record_saved",
            OperationEvent::SaveProgress { .. } => "save_progress",
            OperationEvent::RecordDeleted { .. } => "record_deleted",
            OperationEvent::RecordFetched { .. } => "record_fetched",
            OperationEvent::FetchProgress { .. } => "fetch_progress",
            OperationEvent::RecordMatched { .. } => "record_matched",
            OperationEvent::ModifyFinished(_) => "modify_finished",
            OperationEvent::FetchFinished(_) => "fetch_finished",
            OperationEvent::QueryFinished(_) => "query_finished",
            OperationEvent::Rejected(_) => "rejected",
            OperationEvent::Completed => "completed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn classifies_events() {
        let saved = OperationEvent::RecordSaved {
            id: "a".into(),
            result: Ok(Record::with_id("a", "T")),
        };
        assert!(saved.is_item_event());
        assert!(saved.aggregate_result().is_none());

        let finished = OperationEvent::QueryFinished(Ok(None));
        assert!(!finished.is_item_event());
        assert_eq!(finished.aggregate_result(), Some(Ok(())));

        let failed = OperationEvent::ModifyFinished(Err(ErrorCode::ZoneBusy.into()));
        assert_eq!(
            failed.aggregate_result(),
            Some(Err(Error::Transaction(ErrorCode::ZoneBusy)))
        );

        assert!(!OperationEvent::Completed.is_item_event());
        assert_eq!(OperationEvent::Completed.label(), "completed");
    }
}

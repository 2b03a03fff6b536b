//! Operation types submitted to a database.
//!
//! An [`Operation`] pairs what to do ([`OperationKind`]) with the failures to simulate
//! ([`FaultInjection`]) and the single handler that receives its events.

use crate::{ErrorCode, OperationEvent, Query, Record, RecordId, TransactionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Receives every event of one operation, in order.
pub type EventHandler = Box<dyn FnMut(OperationEvent) + Send + 'static>;

/// Save and delete records in one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRecords {
    pub records_to_save: Vec<Record>,
    pub record_ids_to_delete: Vec<RecordId>,
}

/// Fetch records by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRecords {
    pub record_ids: Vec<RecordId>,
    /// `None` returns full records.
    pub desired_keys: Option<Vec<String>>,
}

/// Scan a store with a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecords {
    pub query: Query,
    /// `None` returns full records.
    pub desired_keys: Option<Vec<String>>,
    /// `None` means unlimited.
    pub results_limit: Option<usize>,
}

/// What an operation does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationKind {
    Modify(ModifyRecords),
    Fetch(FetchRecords),
    Query(QueryRecords),
    /// A generic database operation with no store semantics.
    Bare,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Modify(_) => "modify",
            OperationKind::Fetch(_) => "fetch",
            OperationKind::Query(_) => "query",
            OperationKind::Bare => "bare",
        }
    }
}

/// Failures to simulate while executing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultInjection {
    /// Reported as the aggregate result unless per-item failures occurred.
    pub transaction_error: Option<TransactionError>,
    /// Records that fail individually, with the code each one reports.
    pub record_errors: BTreeMap<RecordId, ErrorCode>,
}

impl FaultInjection {
    /// Code each flagged record fails with unless one is given explicitly.
    pub const DEFAULT_RECORD_ERROR: ErrorCode = ErrorCode::InternalError;

    pub fn is_empty(&self) -> bool {
        self.transaction_error.is_none() && self.record_errors.is_empty()
    }

    pub fn record_error(&self, id: &RecordId) -> Option<ErrorCode> {
        self.record_errors.get(id).copied()
    }

    /// Combine with lower-priority `fallback` faults.
    ///
    /// `self`'s transaction error wins; flagged records are unioned, with `self`'s codes
    /// taking precedence for records flagged by both.
    pub fn merged_over(&self, fallback: &FaultInjection) -> FaultInjection {
        let mut record_errors = fallback.record_errors.clone();
        record_errors.extend(self.record_errors.iter().map(|(id, code)| (id.clone(), *code)));
        FaultInjection {
            transaction_error: self.transaction_error.or(fallback.transaction_error),
            record_errors,
        }
    }
}

/// A unit of work submitted to a database.
pub struct Operation {
    name: Option<String>,
    kind: OperationKind,
    faults: FaultInjection,
    handler: Option<EventHandler>,
}

impl Operation {
    /// Wrap an operation kind with no faults and no handler.
    pub fn new(kind: OperationKind) -> Self {
        Self {
            name: None,
            kind,
            faults: FaultInjection::default(),
            handler: None,
        }
    }

    /// Save `records_to_save`, then delete `record_ids_to_delete`.
    pub fn modify(records_to_save: Vec<Record>, record_ids_to_delete: Vec<RecordId>) -> Self {
        Self::new(OperationKind::Modify(ModifyRecords {
            records_to_save,
            record_ids_to_delete,
        }))
    }

    /// Fetch `record_ids`.
    pub fn fetch(record_ids: Vec<RecordId>) -> Self {
        Self::new(OperationKind::Fetch(FetchRecords {
            record_ids,
            desired_keys: None,
        }))
    }

    /// Run `query` with no projection or limit.
    pub fn query(query: Query) -> Self {
        Self::new(OperationKind::Query(QueryRecords {
            query,
            desired_keys: None,
            results_limit: None,
        }))
    }

    /// An operation the engine does not model.
    pub fn bare() -> Self {
        Self::new(OperationKind::Bare)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict returned fields. Ignored by modify and bare operations.
    pub fn with_desired_keys<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        match &mut self.kind {
            OperationKind::Fetch(fetch) => fetch.desired_keys = Some(keys),
            OperationKind::Query(query) => query.desired_keys = Some(keys),
            OperationKind::Modify(_) | OperationKind::Bare => {}
        }
        self
    }

    /// Cap the number of query matches. A limit of 0 means unlimited.
    pub fn with_results_limit(mut self, limit: usize) -> Self {
        if let OperationKind::Query(query) = &mut self.kind {
            query.results_limit = (limit > 0).then_some(limit);
        }
        self
    }

    /// Fail the whole operation with `error`.
    pub fn with_transaction_error(mut self, error: impl Into<TransactionError>) -> Self {
        self.faults.transaction_error = Some(error.into());
        self
    }

    /// Fail each listed record with [`FaultInjection::DEFAULT_RECORD_ERROR`].
    pub fn with_record_errors<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = RecordId>,
    {
        for id in ids {
            self.faults
                .record_errors
                .insert(id, FaultInjection::DEFAULT_RECORD_ERROR);
        }
        self
    }

    /// Fail one record with a specific code.
    pub fn with_record_error(mut self, id: impl Into<RecordId>, code: ErrorCode) -> Self {
        self.faults.record_errors.insert(id.into(), code);
        self
    }

    /// Install the handler that receives this operation's events.
    pub fn on_event<F>(mut self, handler: F) -> Self
    where
        F: FnMut(OperationEvent) + Send + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn faults(&self) -> &FaultInjection {
        &self.faults
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Split into its parts so the handler can be driven separately.
    pub fn into_parts(self) -> (OperationKind, FaultInjection, Option<EventHandler>) {
        (self.kind, self.faults, self.handler)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("faults", &self.faults)
            .field("handler", &self.handler.as_ref().map(|_| "FnMut(OperationEvent)"))
            .finish()
    }
}

//! The simulated database handle.
//!
//! A [`SimDatabase`] is a cheap handle onto one scope's store. Operations submitted to it run
//! on the shared worker; their events are delivered to the operation's handler in order,
//! after the store lock has been released, so callbacks may freely read or write the store.
//!
//! The direct store methods (`add_records`, `get_records`, ...) act synchronously and exist
//! for test setup and inspection.

use std::fmt;
use std::sync::Arc;

use cumulus_engine::{
    Error, ErrorCode, EventHandler, FaultInjection, Operation, OperationEvent, OperationKind,
    Query, QueryCursor, Record, RecordId, TransactionError,
};

use crate::registry::{ExecutedOperation, ScopeStore, StoreRegistry};
use crate::{worker, Scope};

/// Result type delivered to legacy callbacks.
pub type Result<T> = cumulus_engine::error::Result<T>;

/// A handle onto the store of one scope.
#[derive(Clone)]
pub struct SimDatabase {
    store: Arc<ScopeStore>,
}

impl SimDatabase {
    /// The registered database for `scope`.
    pub fn new(scope: Scope) -> Self {
        Self::with_registry(StoreRegistry::global(), scope)
    }

    /// The database for `scope` in a specific registry.
    pub fn with_registry(registry: &StoreRegistry, scope: Scope) -> Self {
        Self {
            store: registry.store(scope),
        }
    }

    /// A database backed by a fresh store that no registry knows about.
    pub fn detached(scope: Scope) -> Self {
        Self {
            store: Arc::new(ScopeStore::new(scope)),
        }
    }

    pub fn scope(&self) -> Scope {
        self.store.scope()
    }

    /// Whether both handles read and write the same store.
    pub fn shares_store_with(&self, other: &SimDatabase) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }

    // ---- direct store access ----

    /// Upsert records by identifier.
    pub fn add_records(&self, records: impl IntoIterator<Item = Record>) {
        self.store.add_records(records);
    }

    pub fn get_records(&self) -> Vec<Record> {
        self.store.records()
    }

    /// Stored records for `ids`. Missing ids are dropped.
    pub fn get_records_matching_ids(&self, ids: &[RecordId]) -> Vec<Record> {
        self.store.records_matching_ids(ids)
    }

    pub fn get_records_matching_query(&self, query: &Query) -> Vec<Record> {
        self.store.records_matching_query(query)
    }

    /// Remove records by identifier. Absent ids are ignored.
    pub fn remove_records(&self, ids: &[RecordId]) -> usize {
        self.store.remove_records(ids)
    }

    /// Drop every record and injected fault of this scope.
    pub fn reset_store(&self) {
        self.store.reset();
        tracing::debug!(scope = %self.scope(), "Scope store reset");
    }

    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    // ---- scope-level fault injection ----

    /// Fail every later operation on this scope with `error`, unless the operation injects its
    /// own.
    pub fn inject_transaction_error(&self, error: impl Into<TransactionError>) {
        self.store.set_transaction_error(Some(error.into()));
    }

    /// Fail the listed records in every later operation on this scope.
    pub fn inject_record_errors<I>(&self, ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        self.store.set_record_errors(
            ids.into_iter()
                .map(|id| (id, FaultInjection::DEFAULT_RECORD_ERROR)),
        );
    }

    pub fn inject_record_error(&self, id: impl Into<RecordId>, code: ErrorCode) {
        self.store.set_record_errors([(id.into(), code)]);
    }

    /// Scope-level faults currently in effect.
    pub fn injected_faults(&self) -> FaultInjection {
        self.store.faults()
    }

    /// The most recently finished operation on this scope.
    pub fn last_executed(&self) -> Option<ExecutedOperation> {
        self.store.last_executed()
    }

    // ---- operations ----

    /// Queue `operation`. Its events arrive later on the worker thread.
    pub fn submit(&self, operation: Operation) {
        let name = operation.name().map(str::to_owned);
        let (kind, faults, handler) = operation.into_parts();
        let scope = self.scope();

        tracing::debug!(
            scope = %scope,
            kind = kind.label(),
            name = name.as_deref(),
            "Operation submitted"
        );
        if let OperationKind::Query(_) = &kind {
            if !faults.record_errors.is_empty() {
                tracing::debug!(
                    scope = %scope,
                    ignored = faults.record_errors.len(),
                    "Per-record errors are ignored by queries"
                );
            }
        }

        let store = Arc::clone(&self.store);
        worker::dispatch(move || {
            let events = store.execute(&kind, &faults, name.as_deref());
            log_outcome(scope, &kind, name.as_deref(), &events);
            deliver(events, handler);
        });
    }

    // ---- legacy single-record calls ----

    /// Not supported; use [`Operation::modify`].
    pub fn save<F>(&self, _record: Record, callback: F)
    where
        F: FnOnce(Result<Record>) + Send + 'static,
    {
        self.not_implemented("save", "Use Operation::modify to save records.", callback);
    }

    /// Not supported; use [`Operation::modify`].
    pub fn delete_record<F>(&self, _id: RecordId, callback: F)
    where
        F: FnOnce(Result<RecordId>) + Send + 'static,
    {
        self.not_implemented(
            "delete(with_record_id)",
            "Use Operation::modify to delete records.",
            callback,
        );
    }

    /// Not supported; use [`Operation::fetch`].
    pub fn fetch_record<F>(&self, _id: RecordId, callback: F)
    where
        F: FnOnce(Result<Record>) + Send + 'static,
    {
        self.not_implemented(
            "fetch(with_record_id)",
            "Use Operation::fetch to fetch records.",
            callback,
        );
    }

    /// Not supported; use [`Operation::fetch`].
    pub fn fetch_records<F>(
        &self,
        _ids: Vec<RecordId>,
        _desired_keys: Option<Vec<String>>,
        callback: F,
    ) where
        F: FnOnce(Result<Vec<Record>>) + Send + 'static,
    {
        self.not_implemented(
            "fetch(with_record_ids)",
            "Use Operation::fetch to fetch records.",
            callback,
        );
    }

    /// Not supported; use [`Operation::query`].
    pub fn perform_query<F>(&self, _query: Query, callback: F)
    where
        F: FnOnce(Result<Vec<Record>>) + Send + 'static,
    {
        self.not_implemented(
            "perform(query)",
            "Use Operation::query to query records.",
            callback,
        );
    }

    /// Not supported; use [`Operation::query`].
    pub fn fetch_query<F>(
        &self,
        _query: Query,
        _desired_keys: Option<Vec<String>>,
        _results_limit: usize,
        callback: F,
    ) where
        F: FnOnce(Result<(Vec<Record>, Option<QueryCursor>)>) + Send + 'static,
    {
        self.not_implemented(
            "fetch(with_query)",
            "Use Operation::query to query records.",
            callback,
        );
    }

    fn not_implemented<T, F>(&self, operation: &'static str, recovery: &'static str, callback: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        tracing::warn!(scope = %self.scope(), operation, "Legacy database call is not implemented");
        worker::dispatch(move || {
            callback(Err(Error::OperationNotImplemented {
                operation: operation.to_string(),
                recovery: recovery.to_string(),
            }))
        });
    }
}

impl fmt::Debug for SimDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimDatabase")
            .field("scope", &self.scope())
            .field("records", &self.store.len())
            .finish()
    }
}

fn log_outcome(scope: Scope, kind: &OperationKind, name: Option<&str>, events: &[OperationEvent]) {
    let outcome = events.iter().find_map(|event| match event {
        OperationEvent::Rejected(e) => Some(Err(e.clone())),
        other => other.aggregate_result(),
    });

    match outcome {
        Some(Ok(())) => tracing::info!(
            scope = %scope,
            kind = kind.label(),
            name,
            events = events.len(),
            "Operation executed"
        ),
        Some(Err(e @ Error::OperationNotSupported { .. })) => tracing::warn!(
            scope = %scope,
            kind = kind.label(),
            name,
            error = %e,
            "Operation rejected"
        ),
        Some(Err(e)) => tracing::info!(
            scope = %scope,
            kind = kind.label(),
            name,
            code = e.code(),
            error = %e,
            "Operation executed with failure"
        ),
        None => {}
    }
}

fn deliver(events: Vec<OperationEvent>, handler: Option<EventHandler>) {
    match handler {
        Some(mut handler) => {
            for event in events {
                handler(event);
            }
        }
        None => tracing::trace!(dropped = events.len(), "Operation has no event handler"),
    }
}

//! Process-wide registry of scoped stores.
//!
//! Every container in the process resolves a scope to the same [`ScopeStore`]. Stores are
//! created lazily on first access and live for the rest of the process; [`StoreRegistry::reset_all`]
//! empties them in place so handles obtained before a reset stay connected.
//!
//! The registry also owns the simulated identity state (account status and user record),
//! which is process-wide in the same way.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use cumulus_engine::{
    execute, AccountStatus, ErrorCode, FaultInjection, OperationEvent, OperationKind, Query,
    Record, RecordId, RecordTable, TransactionError,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::Scope;

/// Summary of the most recent operation run against a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedOperation {
    /// `modify`, `fetch`, `query` or `bare`
    pub kind: String,
    pub name: Option<String>,
    pub scope: Scope,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    table: RecordTable,
    /// Applied beneath every operation's own faults.
    faults: FaultInjection,
    last_executed: Option<ExecutedOperation>,
}

/// The records of one scope plus its injected faults.
#[derive(Debug)]
pub struct ScopeStore {
    scope: Scope,
    state: RwLock<StoreState>,
}

impl ScopeStore {
    pub(crate) fn new(scope: Scope) -> Self {
        Self {
            scope,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert records by identifier.
    pub fn add_records(&self, records: impl IntoIterator<Item = Record>) {
        self.write().table.add_records(records);
    }

    /// Every record, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.read().table.records().to_vec()
    }

    /// Stored records for `ids`, in request order. Missing ids are dropped.
    pub fn records_matching_ids(&self, ids: &[RecordId]) -> Vec<Record> {
        self.read().table.matching_ids(ids).cloned().collect()
    }

    pub fn records_matching_query(&self, query: &Query) -> Vec<Record> {
        self.read().table.matching_query(query).cloned().collect()
    }

    /// Remove records by identifier, returning how many were present.
    pub fn remove_records(&self, ids: &[RecordId]) -> usize {
        self.write().table.remove_records(ids)
    }

    pub fn len(&self) -> usize {
        self.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().table.is_empty()
    }

    /// Drop every record and every injected fault.
    pub fn reset(&self) {
        let mut state = self.write();
        state.table.clear();
        state.faults = FaultInjection::default();
        state.last_executed = None;
    }

    pub fn set_transaction_error(&self, error: Option<TransactionError>) {
        self.write().faults.transaction_error = error;
    }

    pub fn set_record_errors(&self, errors: impl IntoIterator<Item = (RecordId, ErrorCode)>) {
        self.write().faults.record_errors.extend(errors);
    }

    /// Faults currently injected at scope level.
    pub fn faults(&self) -> FaultInjection {
        self.read().faults.clone()
    }

    pub fn last_executed(&self) -> Option<ExecutedOperation> {
        self.read().last_executed.clone()
    }

    /// Run one operation to completion under the store's write lock.
    ///
    /// `faults` are merged over the scope-level faults before execution.
    pub(crate) fn execute(
        &self,
        kind: &OperationKind,
        faults: &FaultInjection,
        name: Option<&str>,
    ) -> Vec<OperationEvent> {
        let mut state = self.write();
        let faults = faults.merged_over(&state.faults);
        let events = execute(kind, &faults, &mut state.table);
        state.last_executed = Some(ExecutedOperation {
            kind: kind.label().to_string(),
            name: name.map(str::to_owned),
            scope: self.scope,
            finished_at: Utc::now(),
        });
        events
    }
}

#[derive(Debug, Default)]
struct IdentityState {
    account_status: Option<AccountStatus>,
    user_record: Option<Record>,
}

/// Scope-keyed stores shared by every container in the process.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: DashMap<Scope, Arc<ScopeStore>>,
    identity: RwLock<IdentityState>,
}

static REGISTRY: OnceLock<StoreRegistry> = OnceLock::new();

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry every container resolves scopes through.
    pub fn global() -> &'static StoreRegistry {
        REGISTRY.get_or_init(StoreRegistry::new)
    }

    /// The store for `scope`, created on first access.
    pub fn store(&self, scope: Scope) -> Arc<ScopeStore> {
        self.stores
            .entry(scope)
            .or_insert_with(|| {
                tracing::debug!(scope = %scope, "Scope store created");
                Arc::new(ScopeStore::new(scope))
            })
            .value()
            .clone()
    }

    /// Number of scopes accessed so far.
    pub fn scope_count(&self) -> usize {
        self.stores.len()
    }

    /// Empty every store and clear the identity state.
    pub fn reset_all(&self) {
        for entry in self.stores.iter() {
            entry.value().reset();
        }
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) = IdentityState::default();

        tracing::info!(scopes = self.stores.len(), "Simulation state reset");
    }

    /// `None` while the status has never been set.
    pub fn account_status(&self) -> Option<AccountStatus> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .account_status
    }

    pub fn set_account_status(&self, status: Option<AccountStatus>) {
        self.identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .account_status = status;
    }

    pub fn user_record(&self) -> Option<Record> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_record
            .clone()
    }

    pub fn set_user_record(&self, record: Option<Record>) {
        self.identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user_record = record;
    }
}

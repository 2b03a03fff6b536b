//! Deterministic execution of one operation against one record table.
//!
//! [`execute`] applies an operation's effects to the table and returns the exact event
//! sequence its handler must observe:
//!
//! - **Modify**: for each record to save, `RecordSaved` then `SaveProgress`; then
//!   `RecordDeleted` for each id to delete; then `ModifyFinished`; then `Completed`.
//! - **Fetch**: for each requested id present in the table, `RecordFetched` then
//!   `FetchProgress`; absent ids are skipped silently. Then `FetchFinished`, `Completed`.
//! - **Query**: `RecordMatched` for each match in insertion order up to the results
//!   limit, then `QueryFinished` (cursor always `None`), then `Completed`.
//! - **Bare**: a single `Rejected` event and nothing else.
//!
//! Aggregate results follow one precedence rule: any per-item failure makes the result a
//! [`Error::PartialFailure`] holding every failed item; otherwise the injected transaction
//! error, if any; otherwise success.

use crate::error::Result;
use crate::operation::{FaultInjection, FetchRecords, ModifyRecords, OperationKind, QueryRecords};
use crate::{Error, OperationEvent, PartialErrors, RecordTable};

/// Run `kind` against `table` with the given faults.
pub fn execute(
    kind: &OperationKind,
    faults: &FaultInjection,
    table: &mut RecordTable,
) -> Vec<OperationEvent> {
    let mut events = Vec::new();
    match kind {
        OperationKind::Modify(modify) => {
            run_modify(modify, faults, table, &mut events);
            events.push(OperationEvent::Completed);
        }
        OperationKind::Fetch(fetch) => {
            run_fetch(fetch, faults, table, &mut events);
            events.push(OperationEvent::Completed);
        }
        OperationKind::Query(query) => {
            run_query(query, faults, table, &mut events);
            events.push(OperationEvent::Completed);
        }
        OperationKind::Bare => {
            events.push(OperationEvent::Rejected(Error::OperationNotSupported {
                operation: kind.label().to_string(),
            }));
        }
    }
    events
}

fn run_modify(
    op: &ModifyRecords,
    faults: &FaultInjection,
    table: &mut RecordTable,
    events: &mut Vec<OperationEvent>,
) {
    let mut failures = PartialErrors::new();
    let progress = batch_progress(
        op.records_to_save.len(),
        op.records_to_save
            .iter()
            .filter(|r| faults.record_error(&r.id).is_some())
            .count(),
    );

    for record in &op.records_to_save {
        let result = match faults.record_error(&record.id) {
            Some(code) => {
                failures.insert(record.id.clone(), code);
                Err(Error::Transaction(code))
            }
            None => {
                table.upsert(record.clone());
                Ok(record.clone())
            }
        };
        events.push(OperationEvent::RecordSaved {
            id: record.id.clone(),
            result,
        });
        events.push(OperationEvent::SaveProgress {
            id: record.id.clone(),
            progress,
        });
    }

    for id in &op.record_ids_to_delete {
        let result = match faults.record_error(id) {
            Some(code) => {
                failures.insert(id.clone(), code);
                Err(Error::Transaction(code))
            }
            None => {
                table.remove(id);
                Ok(())
            }
        };
        events.push(OperationEvent::RecordDeleted {
            id: id.clone(),
            result,
        });
    }

    events.push(OperationEvent::ModifyFinished(aggregate(failures, faults)));
}

fn run_fetch(
    op: &FetchRecords,
    faults: &FaultInjection,
    table: &RecordTable,
    events: &mut Vec<OperationEvent>,
) {
    let mut failures = PartialErrors::new();
    let present: Vec<_> = table.matching_ids(&op.record_ids).collect();
    let progress = batch_progress(
        present.len(),
        present
            .iter()
            .filter(|r| faults.record_error(&r.id).is_some())
            .count(),
    );

    for record in present {
        let result = match faults.record_error(&record.id) {
            Some(code) => {
                failures.insert(record.id.clone(), code);
                Err(Error::Transaction(code))
            }
            None => Ok(record.project(op.desired_keys.as_deref())),
        };
        events.push(OperationEvent::RecordFetched {
            id: record.id.clone(),
            result,
        });
        events.push(OperationEvent::FetchProgress {
            id: record.id.clone(),
            progress,
        });
    }

    events.push(OperationEvent::FetchFinished(aggregate(failures, faults)));
}

fn run_query(
    op: &QueryRecords,
    faults: &FaultInjection,
    table: &RecordTable,
    events: &mut Vec<OperationEvent>,
) {
    let limit = op.results_limit.unwrap_or(usize::MAX);
    for record in table.matching_query(&op.query).take(limit) {
        let result = match faults.transaction_error {
            Some(error) => Err(error.into()),
            None => Ok(record.project(op.desired_keys.as_deref())),
        };
        events.push(OperationEvent::RecordMatched {
            id: record.id.clone(),
            result,
        });
    }

    let result = match faults.transaction_error {
        Some(error) => Err(error.into()),
        None => Ok(None),
    };
    events.push(OperationEvent::QueryFinished(result));
}

/// Fraction of a batch that succeeds; exactly 1.0 when nothing is flagged.
fn batch_progress(batch: usize, failing: usize) -> f64 {
    if batch == 0 || failing == 0 {
        return 1.0;
    }
    (batch - failing) as f64 / batch as f64
}

fn aggregate(failures: PartialErrors, faults: &FaultInjection) -> Result<()> {
    if !failures.is_empty() {
        return Err(Error::PartialFailure(failures));
    }
    match faults.transaction_error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

//! Operations submitted through a database handle.

mod common;

use std::sync::{Arc, Mutex};
use std::thread;

use common::{labels, make_records, run, setup};
use cumulus_sim::{
    Error, ErrorCode, Operation, OperationEvent, Predicate, Query, Record, RecordId, Scope,
    SimDatabase,
};
use tokio::sync::oneshot;

#[tokio::test]
async fn test_modify_saves_in_order_then_completes() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);

    let op = Operation::modify(make_records("r", "Message", 2), vec![]);
    let events = run(&database, op).await;

    assert_eq!(
        labels(&events),
        vec![
            "record_saved",
            "save_progress",
            "record_saved",
            "save_progress",
            "modify_finished",
            "completed"
        ]
    );
    assert_eq!(events[4], OperationEvent::ModifyFinished(Ok(())));
    assert_eq!(database.record_count(), 2);
}

#[tokio::test]
async fn test_modify_partial_failure() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);

    let op = Operation::modify(make_records("r", "Message", 2), vec![])
        .with_record_errors([RecordId::new("r1")]);
    let events = run(&database, op).await;

    assert!(matches!(&events[0], OperationEvent::RecordSaved { result: Ok(_), .. }));
    assert_eq!(
        events[2],
        OperationEvent::RecordSaved {
            id: "r1".into(),
            result: Err(Error::Transaction(ErrorCode::InternalError)),
        }
    );
    match &events[4] {
        OperationEvent::ModifyFinished(Err(err)) => {
            assert!(err.is_partial_failure());
            assert_eq!(err.code(), cumulus_sim::PARTIAL_FAILURE_CODE);
            let items = err.partial_errors().unwrap();
            assert_eq!(items.len(), 1);
            assert!(!items.item_error(&"r1".into()).unwrap().is_partial_failure());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(events[5], OperationEvent::Completed);

    let stored: Vec<RecordId> = database.get_records().into_iter().map(|r| r.id).collect();
    assert_eq!(stored, vec![RecordId::new("r0")]);
}

#[tokio::test]
async fn test_modify_deletes_without_progress() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Public);
    database.add_records(make_records("r", "Message", 3));

    let op = Operation::modify(vec![], vec!["r0".into(), "r2".into()]);
    let events = run(&database, op).await;

    assert_eq!(
        labels(&events),
        vec!["record_deleted", "record_deleted", "modify_finished", "completed"]
    );
    assert_eq!(database.record_count(), 1);
}

#[tokio::test]
async fn test_modify_delete_failure_keeps_record() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Public);
    database.add_records(make_records("r", "Message", 3));

    let op = Operation::modify(vec![], vec!["r0".into(), "r1".into(), "r2".into()])
        .with_record_errors([RecordId::new("r1")])
        .with_transaction_error(ErrorCode::ServiceUnavailable);
    let events = run(&database, op).await;

    let remaining: Vec<RecordId> = database.get_records().into_iter().map(|r| r.id).collect();
    assert_eq!(remaining, vec![RecordId::new("r1")]);
    match &events[3] {
        OperationEvent::ModifyFinished(Err(err)) => {
            assert_eq!(err.partial_errors().unwrap().len(), 1);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_projects_and_skips_absent() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);
    database.add_records(make_records("r", "Message", 2));

    let op = Operation::fetch(vec!["r1".into(), "gone".into()]).with_desired_keys(["one"]);
    let events = run(&database, op).await;

    assert_eq!(
        labels(&events),
        vec!["record_fetched", "fetch_progress", "fetch_finished", "completed"]
    );
    match &events[0] {
        OperationEvent::RecordFetched { id, result: Ok(record) } => {
            assert_eq!(id.name(), "r1");
            assert_eq!(record.keys().collect::<Vec<_>>(), vec!["one"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(events[1], OperationEvent::FetchProgress { id: "r1".into(), progress: 1.0 });

    // the stored record keeps every field
    let stored = database.get_records_matching_ids(&["r1".into()]);
    assert_eq!(stored[0].keys().count(), 3);
}

#[tokio::test]
async fn test_fetch_partial_failure_supersedes_transaction_error() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);
    database.add_records(make_records("r", "Message", 3));

    let op = Operation::fetch(vec!["r0".into(), "r1".into(), "r2".into()])
        .with_transaction_error(ErrorCode::NetworkUnavailable)
        .with_record_error("r0", ErrorCode::UnknownItem)
        .with_record_error("r2", ErrorCode::ZoneBusy);
    let events = run(&database, op).await;

    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            OperationEvent::FetchProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 3);
    assert!(progress.iter().all(|p| (*p - 1.0 / 3.0).abs() < f64::EPSILON));

    match &events[6] {
        OperationEvent::FetchFinished(Err(err)) => {
            let items = err.partial_errors().unwrap();
            assert_eq!(items.get(&"r0".into()), Some(ErrorCode::UnknownItem));
            assert_eq!(items.get(&"r2".into()), Some(ErrorCode::ZoneBusy));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_query_limit_returns_no_cursor() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Public);
    database.add_records(make_records("x", "X", 5));
    database.add_records(make_records("y", "Y", 3));

    let op = Operation::query(Query::all_of("X")).with_results_limit(3);
    let events = run(&database, op).await;

    let matched: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            OperationEvent::RecordMatched { id, .. } => Some(id.name()),
            _ => None,
        })
        .collect();
    assert_eq!(matched, vec!["x0", "x1", "x2"]);
    assert_eq!(events[3], OperationEvent::QueryFinished(Ok(None)));
    assert_eq!(events[4], OperationEvent::Completed);
}

#[tokio::test]
async fn test_query_desired_keys_and_record_type_predicate() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Public);
    database.add_records(make_records("m", "MATCH", 2));
    database.add_records(make_records("t", "TestRecordType", 2));

    let op = Operation::query(Query::new("TestRecordType", Predicate::record_type("MATCH")))
        .with_desired_keys(["this", "two"]);
    let events = run(&database, op).await;

    let records: Vec<&Record> = events
        .iter()
        .filter_map(|e| match e {
            OperationEvent::RecordMatched { result: Ok(record), .. } => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(records.len(), 2);
    for record in records {
        assert_eq!(record.record_type, "MATCH");
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["this", "two"]);
    }
}

#[tokio::test]
async fn test_query_transaction_error_fails_matches() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Public);
    database.add_records(make_records("m", "Message", 2));

    let op = Operation::query(Query::all_of("Message")).with_transaction_error(ErrorCode::QuotaExceeded);
    let events = run(&database, op).await;

    assert_eq!(events.len(), 4);
    for event in &events[..2] {
        assert!(matches!(
            event,
            OperationEvent::RecordMatched { result: Err(Error::Transaction(ErrorCode::QuotaExceeded)), .. }
        ));
    }
    assert_eq!(
        events[2],
        OperationEvent::QueryFinished(Err(ErrorCode::QuotaExceeded.into()))
    );
}

#[tokio::test]
async fn test_bare_operation_is_rejected() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);

    let events = run(&database, Operation::bare()).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        OperationEvent::Rejected(err) => {
            assert_eq!(
                err.to_string(),
                "An invalid or unsupported database operation was performed."
            );
            assert_eq!(err.failure_reason().unwrap(), "bare is not a supported operation.");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_last_executed_tracks_operations() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Shared);
    assert!(database.last_executed().is_none());

    run(&database, Operation::modify(make_records("r", "Message", 1), vec![])).await;
    let first = database.last_executed().unwrap();
    assert_eq!(first.kind, "modify");
    assert_eq!(first.scope, Scope::Shared);
    assert!(first.name.is_none());

    run(&database, Operation::query(Query::all_of("Message")).named("inbox")).await;
    let second = database.last_executed().unwrap();
    assert_eq!(second.kind, "query");
    assert_eq!(second.name.as_deref(), Some("inbox"));
    assert!(second.finished_at >= first.finished_at);

    // other scopes are unaffected
    assert!(SimDatabase::new(Scope::Public).last_executed().is_none());
}

#[tokio::test]
async fn test_submit_returns_before_callbacks() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);
    let (tx, rx) = oneshot::channel();
    let submitter = thread::current().id();

    let mut tx = Some(tx);
    database.submit(
        Operation::modify(make_records("r", "Message", 1), vec![]).on_event(move |event| {
            if event == OperationEvent::Completed {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(thread::current().id());
                }
            }
        }),
    );

    let callback_thread = common::recv(rx).await;
    assert_ne!(callback_thread, submitter);
}

#[tokio::test]
async fn test_operations_run_in_submission_order() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..10 {
        let seen = Arc::clone(&seen);
        let record = Record::with_id("counter", "Counter").with_field("value", i);
        database.submit(Operation::modify(vec![record], vec![]).on_event(move |event| {
            if event == OperationEvent::Completed {
                seen.lock().unwrap().push(i);
            }
        }));
    }

    // the last operation's completion observes every earlier write
    let events = run(&database, Operation::fetch(vec!["counter".into()])).await;
    match &events[0] {
        OperationEvent::RecordFetched { result: Ok(record), .. } => {
            assert_eq!(record.get("value"), Some(&serde_json::json!(9)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_callback_can_use_store_directly() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);
    let (tx, rx) = oneshot::channel();

    let inspector = database.clone();
    let mut tx = Some(tx);
    database.submit(
        Operation::modify(make_records("r", "Message", 2), vec![]).on_event(move |event| {
            if let OperationEvent::ModifyFinished(_) = event {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(inspector.record_count());
                }
            }
        }),
    );

    assert_eq!(common::recv(rx).await, 2);
}

#[tokio::test]
async fn test_panicking_callback_does_not_stop_worker() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);

    database.submit(Operation::modify(make_records("r", "Message", 1), vec![]).on_event(|_| {
        panic!("handler failure");
    }));

    let events = run(&database, Operation::fetch(vec!["r0".into()])).await;
    assert_eq!(labels(&events).last(), Some(&"completed"));
    assert_eq!(database.record_count(), 1);
}

#[tokio::test]
async fn test_operation_without_handler_still_executes() {
    let _guard = setup().await;
    let database = SimDatabase::new(Scope::Private);

    database.submit(Operation::modify(make_records("r", "Message", 3), vec![]));

    // a later operation observes the earlier one's writes
    let events = run(&database, Operation::query(Query::all_of("Message"))).await;
    assert_eq!(events.len(), 5);
}

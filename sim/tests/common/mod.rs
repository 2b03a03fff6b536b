//! Shared helpers for simulation integration tests.
//!
//! Stores are process-wide, so every test takes the suite lock and resets the simulation
//! before touching a database.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::Duration;

use cumulus_sim::{Operation, OperationEvent, Record, SimContainer, SimDatabase};
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::time::timeout;

/// How long to wait for any single callback.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

static SUITE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Serialize the test and start from an empty simulation.
pub async fn setup() -> MutexGuard<'static, ()> {
    cumulus_sim::logging::init_with_filter("cumulus_sim=debug");
    let guard = SUITE_LOCK.get_or_init(|| Mutex::new(())).lock().await;
    SimContainer::reset_all();
    guard
}

/// Submit `operation` and collect its events up to completion or rejection.
pub async fn run(database: &SimDatabase, operation: Operation) -> Vec<OperationEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    database.submit(operation.on_event(move |event| {
        let _ = tx.send(event);
    }));

    let mut events = Vec::new();
    loop {
        let event = timeout(CALLBACK_TIMEOUT, rx.recv())
            .await
            .expect("operation did not finish in time")
            .expect("handler dropped before completion");
        let finished = matches!(
            event,
            OperationEvent::Completed | OperationEvent::Rejected(_)
        );
        events.push(event);
        if finished {
            return events;
        }
    }
}

pub fn labels(events: &[OperationEvent]) -> Vec<&'static str> {
    events.iter().map(OperationEvent::label).collect()
}

/// Records with ids `<prefix>0..<prefix>n`, all of `record_type`.
pub fn make_records(prefix: &str, record_type: &str, n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::with_id(format!("{prefix}{i}"), record_type)
                .with_field("this", "that")
                .with_field("one", "uno")
                .with_field("two", "dos")
        })
        .collect()
}

/// Wait for a single value from a callback.
pub async fn recv<T>(rx: tokio::sync::oneshot::Receiver<T>) -> T {
    timeout(CALLBACK_TIMEOUT, rx)
        .await
        .expect("callback did not fire in time")
        .expect("callback dropped")
}

//! # Cumulus Engine
//!
//! A deterministic in-memory record store with an ordered operation protocol.
//!
//! This crate holds the pure logic behind the Cumulus simulation: records, queries,
//! the per-scope record table, and the executor that turns one operation into the exact
//! sequence of callback events a remote record service would deliver.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about threads, scopes or delivery
//! - **Deterministic**: the same table, operation and faults always yield the same events
//! - **Testable**: pure functions over plain values, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is an identifier, a type tag and a JSON field map. Records live in a
//! [`RecordTable`], which keeps insertion order and overwrites in place on upsert.
//!
//! ### Operations
//!
//! An [`Operation`] is one of:
//! - [`Operation::modify`] - save and delete records in a batch
//! - [`Operation::fetch`] - fetch records by identifier
//! - [`Operation::query`] - scan with a [`Query`]
//! - [`Operation::bare`] - an operation the engine does not model, always rejected
//!
//! Each operation may carry a [`FaultInjection`]: a whole-operation error and a set of
//! records that fail individually.
//!
//! ### Events
//!
//! [`execute`] returns the [`OperationEvent`]s for one run: per-item events first, then a
//! single aggregate result, then [`OperationEvent::Completed`]. When any item fails the
//! aggregate is an [`Error::PartialFailure`] listing every failed item.
//!
//! ## Quick Start
//!
//! ```rust
//! use cumulus_engine::{execute, Operation, OperationEvent, Query, Record, RecordId, RecordTable};
//!
//! let mut table = RecordTable::new();
//!
//! let save = Operation::modify(
//!     vec![
//!         Record::with_id("a", "Message").with_field("body", "hi"),
//!         Record::with_id("b", "Message").with_field("body", "bye"),
//!     ],
//!     vec![],
//! )
//! .with_record_errors([RecordId::new("b")]);
//! let (kind, faults, _) = save.into_parts();
//! let events = execute(&kind, &faults, &mut table);
//!
//! assert_eq!(events.last(), Some(&OperationEvent::Completed));
//! assert_eq!(table.len(), 1);
//!
//! let (kind, faults, _) = Operation::query(Query::all_of("Message")).into_parts();
//! let events = execute(&kind, &faults, &mut table);
//! assert_eq!(events.len(), 3);
//! ```

pub mod error;
pub mod event;
pub mod executor;
pub mod operation;
pub mod query;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use error::{
    AccountStatus, Error, ErrorCode, ErrorDomain, PartialErrors, TransactionError,
    PARTIAL_FAILURE_CODE,
};
pub use event::{OperationEvent, QueryCursor};
pub use executor::execute;
pub use operation::{
    EventHandler, FaultInjection, FetchRecords, ModifyRecords, Operation, OperationKind,
    QueryRecords,
};
pub use query::{Predicate, Query, RECORD_TYPE_KEY};
pub use record::{FieldMap, Record, RecordId};
pub use store::RecordTable;

//! # Cumulus Sim
//!
//! An in-memory, callback-driven stand-in for a scoped remote record store.
//!
//! Client code written against the [`Backend`] traits can run unchanged on the simulation:
//! obtain a [`SimDatabase`] for a [`Scope`] from a [`SimContainer`], submit an
//! [`Operation`], and observe the outcome through the operation's event handler. Every
//! operation runs to completion on a single background worker, so results are deterministic.
//!
//! Stores are shared by scope across the whole process. Call [`SimContainer::reset_all`]
//! before each independent test case.
//!
//! ```no_run
//! use cumulus_sim::{Operation, OperationEvent, Record, Scope, SimContainer};
//!
//! cumulus_sim::logging::init();
//! SimContainer::reset_all();
//!
//! let container = SimContainer::from_config();
//! let database = container.database(Scope::Private);
//!
//! database.submit(
//!     Operation::modify(vec![Record::new("Message").with_field("body", "hi")], vec![])
//!         .on_event(|event| {
//!             if let OperationEvent::ModifyFinished(result) = event {
//!                 println!("saved: {result:?}");
//!             }
//!         }),
//! );
//! ```

pub mod backend;
pub mod config;
pub mod container;
pub mod database;
pub mod logging;
pub mod registry;
pub mod scope;
mod worker;

pub use backend::{Backend, Container, Database, Simulated};
pub use config::{ConfigError, SimConfig};
pub use container::SimContainer;
pub use database::SimDatabase;
pub use registry::{ExecutedOperation, ScopeStore, StoreRegistry};
pub use scope::Scope;

// Engine types used throughout the public API
pub use cumulus_engine::{
    AccountStatus, Error, ErrorCode, ErrorDomain, FaultInjection, Operation, OperationEvent,
    OperationKind, PartialErrors, Predicate, Query, QueryCursor, Record, RecordId,
    TransactionError, PARTIAL_FAILURE_CODE,
};

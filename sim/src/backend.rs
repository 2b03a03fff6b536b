//! The capability group a controller is written against.
//!
//! A [`Backend`] fixes, in one type parameter, which container, database and operation types
//! go together. Code generic over `B: Backend` can only submit `B::Operation`s to
//! `B::Database`s obtained from a `B::Container`, so a controller written once works against
//! the simulation and any other store with the same shape.

use cumulus_engine::{AccountStatus, Error, Operation, RecordId};

use crate::database::Result;
use crate::{Scope, SimContainer, SimDatabase};

pub trait Backend: Sized + Send + Sync + 'static {
    type Container: Container<Self>;
    type Database: Database<Self>;
    /// Anything a batch [`Operation`] can be turned into.
    type Operation: From<Operation> + Send + 'static;
}

/// Entry point that hands out scoped databases.
pub trait Container<B: Backend>: Send + Sync {
    fn identifier(&self) -> &str;

    fn database(&self, scope: Scope) -> B::Database;

    /// Deliver the account status, plus an error for any status other than available.
    fn account_status<F>(&self, callback: F)
    where
        F: FnOnce(AccountStatus, Option<Error>) + Send + 'static;

    fn fetch_user_record_id<F>(&self, callback: F)
    where
        F: FnOnce(Result<RecordId>) + Send + 'static;
}

/// One scope's database. Submission never blocks and never fails synchronously.
pub trait Database<B: Backend>: Clone + Send + Sync {
    fn scope(&self) -> Scope;

    fn submit(&self, operation: B::Operation);
}

/// The in-memory simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simulated;

impl Backend for Simulated {
    type Container = SimContainer;
    type Database = SimDatabase;
    type Operation = Operation;
}

impl Container<Simulated> for SimContainer {
    fn identifier(&self) -> &str {
        SimContainer::identifier(self)
    }

    fn database(&self, scope: Scope) -> SimDatabase {
        SimContainer::database(self, scope)
    }

    fn account_status<F>(&self, callback: F)
    where
        F: FnOnce(AccountStatus, Option<Error>) + Send + 'static,
    {
        SimContainer::account_status(self, callback)
    }

    fn fetch_user_record_id<F>(&self, callback: F)
    where
        F: FnOnce(Result<RecordId>) + Send + 'static,
    {
        SimContainer::fetch_user_record_id(self, callback)
    }
}

impl Database<Simulated> for SimDatabase {
    fn scope(&self) -> Scope {
        SimDatabase::scope(self)
    }

    fn submit(&self, operation: Operation) {
        SimDatabase::submit(self, operation)
    }
}

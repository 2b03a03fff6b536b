//! The simulated container.
//!
//! A container hands out one database per scope and answers identity questions. The stores
//! behind those databases, as well as the account status and user record, are process-wide:
//! every `SimContainer` sees the same state.

use std::collections::HashMap;

use cumulus_engine::{AccountStatus, Error, ErrorCode, Record, RecordId};

use crate::database::{Result, SimDatabase};
use crate::registry::StoreRegistry;
use crate::{config, worker, Scope};

#[derive(Debug, Clone)]
pub struct SimContainer {
    identifier: String,
    /// Databases installed with [`SimContainer::set_database`].
    overrides: HashMap<Scope, SimDatabase>,
}

impl SimContainer {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            overrides: HashMap::new(),
        }
    }

    /// A container named by the configured default identifier.
    pub fn from_config() -> Self {
        Self::new(config::current().container_identifier.clone())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The database for `scope`.
    ///
    /// Unless overridden, this resolves through the process-wide registry, so every container
    /// returns a database on the same store for the same scope.
    pub fn database(&self, scope: Scope) -> SimDatabase {
        match self.overrides.get(&scope) {
            Some(database) => database.clone(),
            None => SimDatabase::new(scope),
        }
    }

    pub fn public_database(&self) -> SimDatabase {
        self.database(Scope::Public)
    }

    pub fn private_database(&self) -> SimDatabase {
        self.database(Scope::Private)
    }

    pub fn shared_database(&self) -> SimDatabase {
        self.database(Scope::Shared)
    }

    /// Make this container return `database` for `scope`.
    pub fn set_database(&mut self, scope: Scope, database: SimDatabase) {
        if database.scope() != scope {
            tracing::warn!(
                container = %self.identifier,
                requested = %scope,
                actual = %database.scope(),
                "Database installed under a different scope"
            );
        }
        self.overrides.insert(scope, database);
    }

    /// Set the simulated account status. `None` means undetermined.
    pub fn set_account_status(status: Option<AccountStatus>) {
        StoreRegistry::global().set_account_status(status);
    }

    /// Set the record describing the signed-in user.
    pub fn set_user_record(record: Option<Record>) {
        StoreRegistry::global().set_user_record(record);
    }

    /// Empty every scope and clear the identity state.
    pub fn reset_all() {
        StoreRegistry::global().reset_all();
    }

    /// Report the account status.
    ///
    /// The status is read when the callback runs on the worker, so it reflects every
    /// change made before that point. Any status other than available is paired with an
    /// error carrying the same status.
    pub fn account_status<F>(&self, callback: F)
    where
        F: FnOnce(AccountStatus, Option<Error>) + Send + 'static,
    {
        let container = self.identifier.clone();
        worker::dispatch(move || {
            let status = current_status();
            tracing::debug!(%container, status = status.code(), "Account status requested");
            let error = (!status.is_available()).then_some(Error::AccountStatus(status));
            callback(status, error)
        });
    }

    /// Report the signed-in user's record identifier, read when the callback runs.
    pub fn fetch_user_record_id<F>(&self, callback: F)
    where
        F: FnOnce(Result<RecordId>) + Send + 'static,
    {
        let container = self.identifier.clone();
        worker::dispatch(move || {
            let outcome = user_record_id();
            if let Err(e) = &outcome {
                tracing::debug!(%container, error = %e, "User record lookup failed");
            }
            callback(outcome)
        });
    }
}

fn current_status() -> AccountStatus {
    StoreRegistry::global()
        .account_status()
        .unwrap_or(AccountStatus::CouldNotDetermine)
}

fn user_record_id() -> Result<RecordId> {
    let status = current_status();
    if !status.is_available() {
        return Err(Error::AccountStatus(status));
    }
    StoreRegistry::global()
        .user_record()
        .map(|record| record.id)
        .ok_or(Error::Transaction(ErrorCode::NotAuthenticated))
}

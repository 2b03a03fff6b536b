//! Error types for the Cumulus engine.
//!
//! Every failure the simulated store reports travels through the failure branch of an
//! operation callback as an [`Error`]. Per-item failures are carried as [`ErrorCode`]s,
//! which have no partial-failure variant, so an item error can never itself be a
//! partial failure.

use crate::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Numeric code reported for an aggregate partial failure.
pub const PARTIAL_FAILURE_CODE: i64 = 2;

/// Service failure codes the simulated store can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InternalError,
    NetworkUnavailable,
    NetworkFailure,
    BadContainer,
    ServiceUnavailable,
    RequestRateLimited,
    NotAuthenticated,
    PermissionFailure,
    UnknownItem,
    InvalidArguments,
    ServerRecordChanged,
    ZoneBusy,
    BadDatabase,
    QuotaExceeded,
    ZoneNotFound,
    UserDeletedZone,
    ServerResponseLost,
    AccountTemporarilyUnavailable,
}

impl ErrorCode {
    /// Every code, in ascending numeric order.
    pub const ALL: [ErrorCode; 18] = [
        ErrorCode::InternalError,
        ErrorCode::NetworkUnavailable,
        ErrorCode::NetworkFailure,
        ErrorCode::BadContainer,
        ErrorCode::ServiceUnavailable,
        ErrorCode::RequestRateLimited,
        ErrorCode::NotAuthenticated,
        ErrorCode::PermissionFailure,
        ErrorCode::UnknownItem,
        ErrorCode::InvalidArguments,
        ErrorCode::ServerRecordChanged,
        ErrorCode::ZoneBusy,
        ErrorCode::BadDatabase,
        ErrorCode::QuotaExceeded,
        ErrorCode::ZoneNotFound,
        ErrorCode::UserDeletedZone,
        ErrorCode::ServerResponseLost,
        ErrorCode::AccountTemporarilyUnavailable,
    ];

    /// The stable numeric value of this code.
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::InternalError => 1,
            ErrorCode::NetworkUnavailable => 3,
            ErrorCode::NetworkFailure => 4,
            ErrorCode::BadContainer => 5,
            ErrorCode::ServiceUnavailable => 6,
            ErrorCode::RequestRateLimited => 7,
            ErrorCode::NotAuthenticated => 9,
            ErrorCode::PermissionFailure => 10,
            ErrorCode::UnknownItem => 11,
            ErrorCode::InvalidArguments => 12,
            ErrorCode::ServerRecordChanged => 14,
            ErrorCode::ZoneBusy => 23,
            ErrorCode::BadDatabase => 24,
            ErrorCode::QuotaExceeded => 25,
            ErrorCode::ZoneNotFound => 26,
            ErrorCode::UserDeletedZone => 28,
            ErrorCode::ServerResponseLost => 34,
            ErrorCode::AccountTemporarilyUnavailable => 36,
        }
    }

    /// Look up a code by its numeric value.
    ///
    /// Returns `None` for unknown values and for [`PARTIAL_FAILURE_CODE`].
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::InternalError => "internal error",
            ErrorCode::NetworkUnavailable => "network unavailable",
            ErrorCode::NetworkFailure => "network failure",
            ErrorCode::BadContainer => "bad container",
            ErrorCode::ServiceUnavailable => "service unavailable",
            ErrorCode::RequestRateLimited => "request rate limited",
            ErrorCode::NotAuthenticated => "not authenticated",
            ErrorCode::PermissionFailure => "permission failure",
            ErrorCode::UnknownItem => "unknown item",
            ErrorCode::InvalidArguments => "invalid arguments",
            ErrorCode::ServerRecordChanged => "server record changed",
            ErrorCode::ZoneBusy => "zone busy",
            ErrorCode::BadDatabase => "bad database",
            ErrorCode::QuotaExceeded => "quota exceeded",
            ErrorCode::ZoneNotFound => "zone not found",
            ErrorCode::UserDeletedZone => "user deleted zone",
            ErrorCode::ServerResponseLost => "server response lost",
            ErrorCode::AccountTemporarilyUnavailable => "account temporarily unavailable",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Availability of the simulated user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountStatus {
    CouldNotDetermine,
    Available,
    Restricted,
    NoAccount,
    TemporarilyUnavailable,
}

impl AccountStatus {
    pub fn code(self) -> i64 {
        match self {
            AccountStatus::CouldNotDetermine => 0,
            AccountStatus::Available => 1,
            AccountStatus::Restricted => 2,
            AccountStatus::NoAccount => 3,
            AccountStatus::TemporarilyUnavailable => 4,
        }
    }

    /// Human-readable explanation of the status.
    pub fn message(self) -> &'static str {
        match self {
            AccountStatus::CouldNotDetermine => "Unable to determine account status.",
            AccountStatus::Available => "Account is available.",
            AccountStatus::Restricted => "Account is restricted.",
            AccountStatus::NoAccount => "No account could be found.",
            AccountStatus::TemporarilyUnavailable => {
                "Account is temporarily unavailable. Please try again later."
            }
        }
    }

    pub fn is_available(self) -> bool {
        self == AccountStatus::Available
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Per-item failures of one batch, keyed by the failing record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialErrors(BTreeMap<RecordId, ErrorCode>);

impl PartialErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `id`. A later failure for the same id replaces the earlier one.
    pub fn insert(&mut self, id: RecordId, code: ErrorCode) {
        self.0.insert(id, code);
    }

    pub fn get(&self, id: &RecordId) -> Option<ErrorCode> {
        self.0.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &ErrorCode)> {
        self.0.iter()
    }

    /// The error each failing item reported on its own callback.
    pub fn item_error(&self, id: &RecordId) -> Option<Error> {
        self.get(id).map(Error::Transaction)
    }
}

impl FromIterator<(RecordId, ErrorCode)> for PartialErrors {
    fn from_iter<T: IntoIterator<Item = (RecordId, ErrorCode)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Which family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Failures reported by the (simulated) record service.
    Service,
    /// Non-available account states.
    AccountStatus,
    /// Misuse of the simulation itself.
    Operation,
}

/// All possible failures delivered by the simulated store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    AccountStatus(AccountStatus),

    #[error("the operation couldn't be completed: {0}")]
    Transaction(ErrorCode),

    #[error("the operation partially failed: {} item(s) reported errors", .0.len())]
    PartialFailure(PartialErrors),

    #[error("An invalid or unsupported database operation was performed.")]
    OperationNotSupported { operation: String },

    #[error("Operation '{operation}' is not implemented.")]
    OperationNotImplemented { operation: String, recovery: String },
}

impl Error {
    /// The numeric code of this error within its domain.
    pub fn code(&self) -> i64 {
        match self {
            Error::AccountStatus(status) => status.code(),
            Error::Transaction(code) => code.code(),
            Error::PartialFailure(_) => PARTIAL_FAILURE_CODE,
            Error::OperationNotSupported { .. } => 0,
            Error::OperationNotImplemented { .. } => 1,
        }
    }

    pub fn domain(&self) -> ErrorDomain {
        match self {
            Error::AccountStatus(_) => ErrorDomain::AccountStatus,
            Error::Transaction(_) | Error::PartialFailure(_) => ErrorDomain::Service,
            Error::OperationNotSupported { .. } | Error::OperationNotImplemented { .. } => {
                ErrorDomain::Operation
            }
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, Error::PartialFailure(_))
    }

    /// The per-item failures, if this is a partial failure.
    pub fn partial_errors(&self) -> Option<&PartialErrors> {
        match self {
            Error::PartialFailure(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Error::OperationNotSupported { operation } => {
                Some(format!("{operation} is not a supported operation."))
            }
            Error::OperationNotImplemented { operation, .. } => {
                Some(format!("{operation} is not implemented."))
            }
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Error::OperationNotSupported { .. } => {
                Some("See the Operation docs for valid operations.".to_string())
            }
            Error::OperationNotImplemented { recovery, .. } => Some(recovery.clone()),
            _ => None,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::Transaction(code)
    }
}

impl From<AccountStatus> for Error {
    fn from(status: AccountStatus) -> Self {
        Error::AccountStatus(status)
    }
}

/// A whole-operation failure that can be injected into an operation or a scope.
///
/// Only service codes and account states qualify. A partial failure is never injected
/// directly; it arises only from per-record failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionError {
    Service(ErrorCode),
    Account(AccountStatus),
}

impl From<ErrorCode> for TransactionError {
    fn from(code: ErrorCode) -> Self {
        TransactionError::Service(code)
    }
}

impl From<AccountStatus> for TransactionError {
    fn from(status: AccountStatus) -> Self {
        TransactionError::Account(status)
    }
}

impl From<TransactionError> for Error {
    fn from(error: TransactionError) -> Self {
        match error {
            TransactionError::Service(code) => Error::Transaction(code),
            TransactionError::Account(status) => Error::AccountStatus(status),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

//! # Engine Error Type
//!
//! The single error type returned by [`SessionEngine`](crate::SessionEngine)
//! operations, classified by [`ErrorKind`].
//!
//! ## Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ErrorKind            Variants                         Retry?          │
//! │  ──────────────────   ──────────────────────────────   ──────          │
//! │  NotFound             RoomNotFound, SessionNotFound    no              │
//! │  InvalidState         RoomAlreadyOccupied,             no              │
//! │                       RoomUnavailable, SessionNotOpen,                 │
//! │                       SessionNotClosed, InvalidRoomStatus,             │
//! │                       CancelWithPayments                               │
//! │  InvariantViolation   BalanceNotZero                   no              │
//! │  Validation           bad input, bad configuration     no              │
//! │  Conflict             lost a concurrent write race     yes             │
//! │  StoreFailure         any other ledger store error     yes             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is returned before commit. Failures after commit (receipt
//! delivery) are reported in the operation outcome instead.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use hamam_core::{CoreError, ValidationError};
use hamam_db::DbError;

/// Coarse error category for callers (front desk UI, retries, metrics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvariantViolation,
    Validation,
    Conflict,
    StoreFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::StoreFailure => "STORE_FAILURE",
        };
        f.write_str(name)
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// State machine, invariant and validation failures from hamam-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A concurrent transaction won the race. Safe to retry.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// The ledger store failed for a reason unrelated to the request.
    #[error("Ledger store failure: {0}")]
    Store(#[source] DbError),

    /// The engine could not be built from its configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::RoomNotFound(_) | EngineError::SessionNotFound(_) => ErrorKind::NotFound,
            EngineError::Core(core) => match core {
                CoreError::RoomAlreadyOccupied { .. }
                | CoreError::RoomUnavailable { .. }
                | CoreError::InvalidRoomStatus { .. }
                | CoreError::SessionNotOpen { .. }
                | CoreError::SessionNotClosed { .. }
                | CoreError::CancelWithPayments { .. } => ErrorKind::InvalidState,
                CoreError::BalanceNotZero { .. } | CoreError::AmountOverflow { .. } => {
                    ErrorKind::InvariantViolation
                }
                CoreError::Validation(_) => ErrorKind::Validation,
            },
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::Store(_) => ErrorKind::StoreFailure,
            EngineError::Config(_) => ErrorKind::Validation,
        }
    }

    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::StoreFailure)
    }

    pub(crate) fn room_occupied(room_id: &str) -> Self {
        CoreError::RoomAlreadyOccupied {
            room_id: room_id.to_string(),
        }
        .into()
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Converts ledger store errors.
///
/// ## Error Mapping
/// ```text
/// DbError::Busy / PoolExhausted        → Conflict
/// open-session index violation         → Conflict (open_session maps it
///                                         to RoomAlreadyOccupied first)
/// anything else                        → Store
/// ```
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        if err.is_transient() || err.is_open_session_violation() {
            return EngineError::Conflict(err.to_string());
        }

        error!(error = %err, "Ledger store failure");
        EngineError::Store(err)
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

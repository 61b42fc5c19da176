//! # Error Types
//!
//! Domain-specific error types for hamam-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hamam-core errors (this file)                                         │
//! │  ├── CoreError        - State machine / invariant violations           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hamam-db errors (separate crate)                                      │
//! │  └── DbError          - Ledger store failures                          │
//! │                                                                         │
//! │  hamam-engine errors                                                   │
//! │  └── EngineError      - What callers see, classified by ErrorKind      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::{RoomStatus, SessionStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations detected by the pure state machine.
///
/// None of these are exceptional: they are ordinary outcomes of asking the
/// engine to do something the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The room already has an open session.
    #[error("Room {room_id} is already occupied")]
    RoomAlreadyOccupied { room_id: String },

    /// The room is under cleaning or maintenance and cannot be rented.
    #[error("Room {room_id} is {status} and cannot be rented")]
    RoomUnavailable { room_id: String, status: RoomStatus },

    /// Operators may only set available, cleaning or maintenance.
    #[error("Room status {status} cannot be set directly")]
    InvalidRoomStatus { status: RoomStatus },

    /// The session has already left the open state.
    ///
    /// ## When This Occurs
    /// - Adding an item or payment to a closed/cancelled session
    /// - Closing or cancelling a session twice
    #[error("Session {session_id} is {status}, expected open")]
    SessionNotOpen {
        session_id: String,
        status: SessionStatus,
    },

    /// A receipt can only be re-delivered for a closed session.
    #[error("Session {session_id} is {status}, expected closed")]
    SessionNotClosed {
        session_id: String,
        status: SessionStatus,
    },

    /// The session cannot close while money is still owed (or over-paid).
    ///
    /// ## User Workflow
    /// ```text
    /// Close Session
    ///      │
    ///      ▼
    /// items 320.00 - payments 0.00 = balance 320.00
    ///      │
    ///      ▼
    /// BalanceNotZero { items_total: 320.00, payments_total: 0.00, balance: 320.00 }
    ///      │
    ///      ▼
    /// UI shows: "320.00 still due"
    /// ```
    #[error(
        "Balance is not zero: items {items_total}, payments {payments_total}, balance {balance}"
    )]
    BalanceNotZero {
        items_total: Money,
        payments_total: Money,
        balance: Money,
    },

    /// Cancellation refused because money was already collected.
    #[error("Session {session_id} has {payments_total} in payments and cannot be cancelled")]
    CancelWithPayments {
        session_id: String,
        payments_total: Money,
    },

    /// A derived amount (line total, items total, payments total or balance)
    /// does not fit in `i64` cents.
    ///
    /// Validation caps prices and payments well below this; it can only be
    /// reached through rows that bypassed validation.
    #[error("{field} overflows the representable amount")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are raised before the engine touches the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

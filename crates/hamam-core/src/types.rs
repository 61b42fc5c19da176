//! # Domain Types
//!
//! Core domain types of the session/room transaction engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Room       │   │     Session     │   │   SessionItem   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  room_id (FK)   │◄──│  session_id(FK) │       │
//! │  │  name           │   │  customer_label │   │  service_name   │       │
//! │  │  status         │   │  status         │   │  quantity       │       │
//! │  │  version        │   │  started/ended  │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                 ▲                                       │
//! │  ┌─────────────────┐            │            ┌─────────────────┐       │
//! │  │   RoomStatus    │            └────────────│     Payment     │       │
//! │  │  available      │                         │  ─────────────  │       │
//! │  │  occupied       │   ┌─────────────────┐   │  session_id(FK) │       │
//! │  │  cleaning       │   │  SessionStatus  │   │  method         │       │
//! │  │  maintenance    │   │  open           │   │  amount_cents   │       │
//! │  └─────────────────┘   │  closed         │   └─────────────────┘       │
//! │                        │  cancelled      │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Derived, Never Stored
//! Line totals, items total, payments total and balance are computed from the
//! raw `quantity_thousandths` / `unit_price_cents` / `amount_cents` columns
//! (see [`crate::totals`]). No row carries a cached total.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Room Status
// =============================================================================

/// Occupancy status of a room.
///
/// `occupied` is a view of session state: only opening and closing a session
/// toggle it. `cleaning` and `maintenance` are set by operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Occupied,
    Cleaning,
    Maintenance,
}

impl RoomStatus {
    /// Returns the storage / wire name of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Occupied => "occupied",
            RoomStatus::Cleaning => "cleaning",
            RoomStatus::Maintenance => "maintenance",
        }
    }

    /// Statuses an operator may set directly.
    pub const fn is_operator_settable(&self) -> bool {
        !matches!(self, RoomStatus::Occupied)
    }
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Available
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// The status of a session (adisyon).
///
/// ## State Machine
/// ```text
///                 close (balance == 0)
///        ┌──────────────────────────────► closed    (terminal)
///  open ─┤
///        └──────────────────────────────► cancelled (terminal)
///                 cancel
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is running: items and payments are accepted.
    Open,
    /// Session was settled with a zero balance.
    Closed,
    /// Session was abandoned administratively.
    Cancelled,
}

impl SessionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if no further transition is possible.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Open)
    }

    /// Returns true if the state machine allows `self → next`.
    pub const fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Open, SessionStatus::Closed)
                | (SessionStatus::Open, SessionStatus::Cancelled)
        )
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Open
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Room
// =============================================================================

/// A rentable room (private hamam, sauna cabin, massage room...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Room {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to staff and printed on the receipt.
    pub name: String,

    pub status: RoomStatus,

    /// Bumped on every status write; orders room events.
    pub version: i64,

    /// When the status last changed.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Checks that a new session may be opened on this room.
    ///
    /// The store enforces the one-open-session rule independently; this
    /// check only produces the precise error for the common case.
    pub fn ensure_rentable(&self) -> CoreResult<()> {
        match self.status {
            RoomStatus::Available => Ok(()),
            RoomStatus::Occupied => Err(CoreError::RoomAlreadyOccupied {
                room_id: self.id.clone(),
            }),
            status => Err(CoreError::RoomUnavailable {
                room_id: self.id.clone(),
                status,
            }),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A ticket tracking one customer's occupancy of a room.
///
/// ## Invariant
/// `ended_at` is `Some` if and only if `status != Open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Session {
    pub id: String,
    pub room_id: String,
    pub customer_label: Option<String>,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Bumped on every mutation of the session or its items/payments.
    pub version: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new open session on a room.
    pub fn open(
        id: impl Into<String>,
        room_id: impl Into<String>,
        customer_label: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Session {
            id: id.into(),
            room_id: room_id.into(),
            customer_label,
            status: SessionStatus::Open,
            started_at: at,
            ended_at: None,
            version: 1,
            updated_at: at,
        }
    }

    /// Fails with `SessionNotOpen` unless the session accepts changes.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.status == SessionStatus::Open {
            Ok(())
        } else {
            Err(CoreError::SessionNotOpen {
                session_id: self.id.clone(),
                status: self.status,
            })
        }
    }

    /// Fails with `SessionNotClosed` unless the session was settled.
    pub fn ensure_closed(&self) -> CoreResult<()> {
        if self.status == SessionStatus::Closed {
            Ok(())
        } else {
            Err(CoreError::SessionNotClosed {
                session_id: self.id.clone(),
                status: self.status,
            })
        }
    }

    /// Applies a terminal transition, returning the finished session.
    ///
    /// The end timestamp is clamped so that it is never before the start.
    pub fn finish(&self, status: SessionStatus, at: DateTime<Utc>) -> CoreResult<Session> {
        if !self.status.can_transition_to(status) {
            return Err(CoreError::SessionNotOpen {
                session_id: self.id.clone(),
                status: self.status,
            });
        }

        let ended_at = at.max(self.started_at);

        Ok(Session {
            status,
            ended_at: Some(ended_at),
            version: self.version + 1,
            updated_at: ended_at,
            ..self.clone()
        })
    }
}

// =============================================================================
// Session Item
// =============================================================================

/// A service line item on a session. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SessionItem {
    pub id: String,
    pub session_id: String,
    pub service_name: String,
    /// Quantity in thousandths (1500 = 1.5).
    pub quantity_thousandths: i64,
    /// Unit price in cents.
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl SessionItem {
    #[inline]
    pub fn quantity(&self) -> Quantity {
        Quantity::from_thousandths(self.quantity_thousandths)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line total = quantity × unit price, always recomputed.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price()
            .checked_times(self.quantity())
            .ok_or_else(|| CoreError::AmountOverflow {
                field: "line total".to_string(),
            })
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a session. A session may have several (split tender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub session_id: String,
    /// Normalized method code: trimmed, lower-case ("cash", "card", "mix").
    pub method: String,
    /// Amount paid in cents.
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

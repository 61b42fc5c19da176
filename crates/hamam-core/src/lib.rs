//! # hamam-core: Pure Business Logic for the Bathhouse POS
//!
//! This crate is the **heart** of the session/room transaction engine. It
//! holds every rule that can be decided without touching the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hamam POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              hamam-engine (SessionEngine, EventFanout)          │   │
//! │  │    open_session, add_item, add_payment, close_session, ...      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ hamam-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ validation│  │   │
//! │  │   │   Room    │  │   Money   │  │  Balance  │  │   rules   │  │   │
//! │  │   │  Session  │  │ Quantity  │  │  Receipt  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    hamam-db (Ledger Store)                      │   │
//! │  │              SQLite queries, migrations, transactions           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Room, Session, SessionItem, Payment)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`quantity`] - Fixed-point quantities (thousandths)
//! - [`totals`] - Derived totals and the zero-balance rule
//! - [`receipt`] - Frozen receipt snapshot handed out at close time
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use hamam_core::{Money, Quantity};
//!
//! let massage = Money::from_cents(30_000);
//! let tea = Money::from_cents(1_000).checked_times(Quantity::whole(2)).unwrap();
//!
//! assert_eq!((massage + tea).to_string(), "320.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod quantity;
pub mod receipt;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use receipt::{ReceiptLine, ReceiptPayment, ReceiptSnapshot};
pub use totals::SessionTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a service name on a line item.
pub const MAX_SERVICE_NAME_LEN: usize = 100;

/// Maximum length of the optional customer label on a session.
pub const MAX_CUSTOMER_LABEL_LEN: usize = 100;

/// Maximum length of a normalized payment method code ("cash", "card", "mix").
pub const MAX_PAYMENT_METHOD_LEN: usize = 20;

/// Maximum quantity of a single line item, in thousandths (999 units).
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY_THOUSANDTHS: i64 = 999_000;

/// Maximum unit price of a line item, in cents (10,000,000.00).
///
/// `MAX_UNIT_PRICE_CENTS × MAX_ITEM_QUANTITY_THOUSANDTHS / 1000` stays far
/// inside `i64`, so a validated line total never overflows.
pub const MAX_UNIT_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum amount of a single payment, in cents (10,000,000,000.00).
///
/// Large enough to settle one maximal line item in a single payment.
pub const MAX_PAYMENT_CENTS: i64 = 1_000_000_000_000;

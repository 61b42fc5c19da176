//! # hamam-engine: Session/Room Transaction Engine
//!
//! Opens, mutates, settles and cancels bathhouse sessions against the
//! ledger store, keeping room occupancy consistent and telling observers
//! about every committed change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hamam POS Workspace                              │
//! │                                                                         │
//! │   front desk / terminals                    observers (room board,     │
//! │          │                                   kitchen, reports)          │
//! │          ▼                                          ▲                   │
//! │  ┌──────────────────────────────────────────────────┼──────────────┐   │
//! │  │                 hamam-engine (THIS CRATE)         │              │   │
//! │  │                                                   │              │   │
//! │  │   SessionEngine ──── publish ──────────────► EventFanout        │   │
//! │  │        │      └───── deliver ──────────────► ReceiptSink        │   │
//! │  │        │                                     (file / discard)   │   │
//! │  └────────┼─────────────────────────────────────────────────────────┘   │
//! │           ▼                                                             │
//! │     hamam-db (LedgerTx)  ──►  hamam-core (rules, totals, receipts)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - The session engine and its outcomes
//! - [`events`] - Committed-change events and the fan-out
//! - [`receipt`] - Receipt sinks
//! - [`config`] - `engine.toml` + environment configuration
//! - [`error`] - Engine error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hamam_engine::{EngineConfig, SessionEngine};
//!
//! hamam_engine::init_tracing();
//!
//! let config = EngineConfig::load(None)?;
//! let (engine, fanout) = SessionEngine::from_config(&config).await?;
//! let mut board = fanout.subscribe();
//!
//! let session = engine.open_session(&room_id, Some("Locker 12")).await?;
//! engine.add_item(&session.id, "Massage", Quantity::whole(1), "300.00".parse()?).await?;
//! engine.add_payment(&session.id, "cash", "300.00".parse()?).await?;
//! let outcome = engine.close_session(&session.id).await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod receipt;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, EngineConfig, ReceiptSinkKind, SessionPolicy};
pub use engine::{CloseOutcome, SessionDetail, SessionEngine};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use events::{EventFanout, EventSink, SessionEvent, Subscription};
pub use receipt::{DiscardSink, FilePreviewSink, ReceiptError, ReceiptOutcome, ReceiptSink};

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "info,hamam=debug,sqlx=warn";

/// Installs the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`]. Calling it
/// again (tests, embedding apps) is a no-op.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

//! # hamam-db: Ledger Store for the Bathhouse POS
//!
//! Durable, transactional storage of rooms, sessions, session items and
//! payments, on SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Hamam POS Data Flow                              │
//! │                                                                         │
//! │  SessionEngine::close_session                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     hamam-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (room.rs,     │    │  (embedded)  │  │   │
//! │  │   │               │    │  session.rs)  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│               │    │ 001_init.sql │  │   │
//! │  │   │ begin() ──────┼───►│  LedgerTx     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`ledger`] - Transactions used by every engine operation
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Row-level SQL and read-side repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hamam_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("hamam.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let room = tx.room(&room_id).await?;
//! tx.commit().await?;
//!
//! let rooms = db.rooms().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use ledger::LedgerTx;
pub use pool::{Database, DbConfig};

pub use repository::room::RoomRepository;
pub use repository::session::SessionRepository;

//! # Repository Module
//!
//! Row-level access to the ledger tables.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   room.rs / session.rs                                                 │
//! │   ├── free fns taking &mut SqliteConnection  (the SQL, written once)   │
//! │   └── RoomRepository / SessionRepository     (pool, read side)         │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │   LedgerTx (ledger.rs)  ← same fns, inside one transaction             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`RoomRepository`](room::RoomRepository) - Room listing and provisioning
//! - [`SessionRepository`](session::SessionRepository) - Session, item and payment reads

pub mod room;
pub mod session;

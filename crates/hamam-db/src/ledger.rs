//! # Ledger Transactions
//!
//! [`LedgerTx`] is the single unit of atomicity for the engine: every state
//! transition reads, validates and writes through one of these.
//!
//! ## Read → Validate → Conditional Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  let mut tx = db.begin().await?;                                        │
//! │                                                                         │
//! │  let session = tx.session(id).await?;        ← read                     │
//! │  session.ensure_open()?;                     ← validate (hamam-core)    │
//! │  tx.finish_session(id, Closed, now).await?;  ← WHERE status = 'open'    │
//! │                                                                         │
//! │  tx.commit().await?;                         ← or drop → rollback       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A concurrent writer that loses the race surfaces as either a failed
//! condition (`None` from a conditional write), a unique-index violation,
//! or `DbError::Busy`.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{room, session};
use hamam_core::{Payment, Room, RoomStatus, Session, SessionItem, SessionStatus};

/// An open ledger store transaction.
///
/// Dropping it without calling [`commit`](LedgerTx::commit) rolls back.
#[derive(Debug)]
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
}

impl LedgerTx {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        LedgerTx { tx }
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    pub async fn room(&mut self, id: &str) -> DbResult<Option<Room>> {
        room::fetch_room(&mut self.tx, id).await
    }

    /// Moves a room from `from` to `to`; `None` if it was not in `from`.
    pub async fn transition_room(
        &mut self,
        id: &str,
        from: RoomStatus,
        to: RoomStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        room::transition_room_status(&mut self.tx, id, from, to, now).await
    }

    /// Operator status write; `None` if the room is missing or occupied.
    pub async fn set_unoccupied_room_status(
        &mut self,
        id: &str,
        to: RoomStatus,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        room::set_unoccupied_status(&mut self.tx, id, to, now).await
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn session(&mut self, id: &str) -> DbResult<Option<Session>> {
        session::fetch_session(&mut self.tx, id).await
    }

    pub async fn open_session_for_room(&mut self, room_id: &str) -> DbResult<Option<Session>> {
        session::fetch_open_session_for_room(&mut self.tx, room_id).await
    }

    pub async fn insert_session(&mut self, s: &Session) -> DbResult<()> {
        session::insert_session(&mut self.tx, s).await
    }

    /// Re-checks that the session is open and bumps its version.
    pub async fn touch_open_session(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        session::touch_open_session(&mut self.tx, id, now).await
    }

    pub async fn finish_session(
        &mut self,
        id: &str,
        status: SessionStatus,
        ended_at: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        session::finish_session(&mut self.tx, id, status, ended_at).await
    }

    // =========================================================================
    // Items / Payments
    // =========================================================================

    pub async fn items(&mut self, session_id: &str) -> DbResult<Vec<SessionItem>> {
        session::fetch_items(&mut self.tx, session_id).await
    }

    pub async fn insert_item(&mut self, item: &SessionItem) -> DbResult<()> {
        session::insert_item(&mut self.tx, item).await
    }

    pub async fn payments(&mut self, session_id: &str) -> DbResult<Vec<Payment>> {
        session::fetch_payments(&mut self.tx, session_id).await
    }

    pub async fn insert_payment(&mut self, payment: &Payment) -> DbResult<()> {
        session::insert_payment(&mut self.tx, payment).await
    }

    // =========================================================================
    // Completion
    // =========================================================================

    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        debug!("Ledger transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!("Ledger transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use hamam_core::{Room, RoomStatus, Session};

    async fn setup() -> (Database, Room) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let room = Room {
            id: "room-1".to_string(),
            name: "Kurna 1".to_string(),
            status: RoomStatus::Available,
            version: 1,
            updated_at: Utc::now(),
        };
        db.rooms().insert(&room).await.unwrap();
        (db, room)
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let (db, room) = setup().await;

        let mut tx = db.begin().await.unwrap();
        tx.insert_session(&Session::open("s-1", &room.id, None, Utc::now()))
            .await
            .unwrap();
        tx.transition_room(&room.id, RoomStatus::Available, RoomStatus::Occupied, Utc::now())
            .await
            .unwrap();
        assert!(tx.open_session_for_room(&room.id).await.unwrap().is_some());
        tx.commit().await.unwrap();

        assert!(db.sessions().get_by_id("s-1").await.unwrap().is_some());
        let room = db.rooms().get_by_id(&room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);
        assert_eq!(room.version, 2);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard() {
        let (db, room) = setup().await;

        let mut tx = db.begin().await.unwrap();
        tx.insert_session(&Session::open("s-1", &room.id, None, Utc::now()))
            .await
            .unwrap();
        tx.rollback().await.unwrap();
        assert!(db.sessions().get_by_id("s-1").await.unwrap().is_none());

        {
            let mut tx = db.begin().await.unwrap();
            tx.insert_session(&Session::open("s-2", &room.id, None, Utc::now()))
                .await
                .unwrap();
        }
        assert!(db.sessions().get_by_id("s-2").await.unwrap().is_none());
    }
}

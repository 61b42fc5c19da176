//! # Session Repository
//!
//! Database operations for sessions, their items and their payments.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert_session() → Session { status: Open, version: 1 }        │
//! │         (partial unique index: one open session per room)              │
//! │                                                                         │
//! │  2. ADD ITEMS / PAYMENTS (append-only)                                 │
//! │     └── touch_open_session() → version + 1, WHERE status = 'open'      │
//! │     └── insert_item() / insert_payment()                               │
//! │                                                                         │
//! │  3. CLOSE or CANCEL (exactly once)                                     │
//! │     └── finish_session() → status, ended_at, WHERE status = 'open'     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use hamam_core::{Payment, Session, SessionItem, SessionStatus};

const SESSION_COLUMNS: &str =
    "id, room_id, customer_label, status, started_at, ended_at, version, updated_at";

// =============================================================================
// Session Queries
// =============================================================================

pub(crate) async fn fetch_session(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(&format!(
        "SELECT {} FROM sessions WHERE id = ?1",
        SESSION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(session)
}

pub(crate) async fn fetch_open_session_for_room(
    conn: &mut SqliteConnection,
    room_id: &str,
) -> DbResult<Option<Session>> {
    let session = sqlx::query_as::<_, Session>(&format!(
        "SELECT {} FROM sessions WHERE room_id = ?1 AND status = 'open'",
        SESSION_COLUMNS
    ))
    .bind(room_id)
    .fetch_optional(conn)
    .await?;

    Ok(session)
}

pub(crate) async fn list_open_sessions(conn: &mut SqliteConnection) -> DbResult<Vec<Session>> {
    let sessions = sqlx::query_as::<_, Session>(&format!(
        "SELECT {} FROM sessions WHERE status = 'open' ORDER BY started_at, id",
        SESSION_COLUMNS
    ))
    .fetch_all(conn)
    .await?;

    Ok(sessions)
}

pub(crate) async fn insert_session(conn: &mut SqliteConnection, session: &Session) -> DbResult<()> {
    debug!(session_id = %session.id, room_id = %session.room_id, "Inserting session");

    sqlx::query(
        r#"
        INSERT INTO sessions (
            id, room_id, customer_label, status,
            started_at, ended_at, version, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&session.id)
    .bind(&session.room_id)
    .bind(&session.customer_label)
    .bind(session.status)
    .bind(session.started_at)
    .bind(session.ended_at)
    .bind(session.version)
    .bind(session.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Bumps the version of a session that is still open.
///
/// This is the in-transaction status re-check for appends: `None` means the
/// session is missing or no longer open, and nothing may be inserted.
pub(crate) async fn touch_open_session(
    conn: &mut SqliteConnection,
    id: &str,
    now: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE sessions SET
            version = version + 1,
            updated_at = ?2
        WHERE id = ?1 AND status = 'open'
        RETURNING version
        "#,
    )
    .bind(id)
    .bind(now)
    .fetch_optional(conn)
    .await?;

    Ok(version)
}

/// Writes a terminal transition, conditional on the row still being open.
///
/// Returns the new version, or `None` if another writer got there first.
pub(crate) async fn finish_session(
    conn: &mut SqliteConnection,
    id: &str,
    status: SessionStatus,
    ended_at: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE sessions SET
            status = ?2,
            ended_at = ?3,
            updated_at = ?3,
            version = version + 1
        WHERE id = ?1 AND status = 'open'
        RETURNING version
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(ended_at)
    .fetch_optional(conn)
    .await?;

    Ok(version)
}

// =============================================================================
// Item / Payment Queries
// =============================================================================

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<SessionItem>> {
    let items = sqlx::query_as::<_, SessionItem>(
        r#"
        SELECT id, session_id, service_name, quantity_thousandths, unit_price_cents, added_at
        FROM session_items
        WHERE session_id = ?1
        ORDER BY added_at, rowid
        "#,
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &SessionItem) -> DbResult<()> {
    debug!(session_id = %item.session_id, service = %item.service_name, "Inserting session item");

    sqlx::query(
        r#"
        INSERT INTO session_items (
            id, session_id, service_name,
            quantity_thousandths, unit_price_cents, added_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.session_id)
    .bind(&item.service_name)
    .bind(item.quantity_thousandths)
    .bind(item.unit_price_cents)
    .bind(item.added_at)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn fetch_payments(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<Payment>> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, session_id, method, amount_cents, paid_at
        FROM payments
        WHERE session_id = ?1
        ORDER BY paid_at, rowid
        "#,
    )
    .bind(session_id)
    .fetch_all(conn)
    .await?;

    Ok(payments)
}

pub(crate) async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(session_id = %payment.session_id, amount = %payment.amount_cents, "Recording payment");

    sqlx::query(
        r#"
        INSERT INTO payments (id, session_id, method, amount_cents, paid_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.session_id)
    .bind(&payment.method)
    .bind(payment.amount_cents)
    .bind(payment.paid_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Read-side access to sessions over the pool.
///
/// All writes go through [`LedgerTx`](crate::LedgerTx).
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Session>> {
        let mut conn = self.pool.acquire().await?;
        fetch_session(&mut conn, id).await
    }

    /// Gets the open session on a room, if any.
    pub async fn open_for_room(&self, room_id: &str) -> DbResult<Option<Session>> {
        let mut conn = self.pool.acquire().await?;
        fetch_open_session_for_room(&mut conn, room_id).await
    }

    /// Lists all open sessions, oldest first.
    pub async fn list_open(&self) -> DbResult<Vec<Session>> {
        let mut conn = self.pool.acquire().await?;
        list_open_sessions(&mut conn).await
    }

    /// Gets all items for a session in insertion order.
    pub async fn get_items(&self, session_id: &str) -> DbResult<Vec<SessionItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, session_id).await
    }

    /// Gets all payments for a session in insertion order.
    pub async fn get_payments(&self, session_id: &str) -> DbResult<Vec<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payments(&mut conn, session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use hamam_core::{Room, RoomStatus};
    use uuid::Uuid;

    async fn setup() -> (Database, Room) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: "Kurna 1".to_string(),
            status: RoomStatus::Available,
            version: 1,
            updated_at: Utc::now(),
        };
        db.rooms().insert(&room).await.unwrap();
        (db, room)
    }

    #[tokio::test]
    async fn test_one_open_session_per_room() {
        let (db, room) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let first = Session::open(Uuid::new_v4().to_string(), &room.id, None, Utc::now());
        insert_session(&mut conn, &first).await.unwrap();

        let second = Session::open(Uuid::new_v4().to_string(), &room.id, None, Utc::now());
        let err = insert_session(&mut conn, &second).await.unwrap_err();
        assert!(err.is_open_session_violation());

        // A finished session frees the slot
        finish_session(&mut conn, &first.id, SessionStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        insert_session(&mut conn, &second).await.unwrap();

        let open = db.sessions().open_for_room(&room.id).await.unwrap().unwrap();
        assert_eq!(open.id, second.id);
        assert_eq!(db.sessions().list_open().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_touch_and_finish_are_conditional() {
        let (db, room) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let session = Session::open(Uuid::new_v4().to_string(), &room.id, None, Utc::now());
        insert_session(&mut conn, &session).await.unwrap();

        assert_eq!(touch_open_session(&mut conn, &session.id, Utc::now()).await.unwrap(), Some(2));

        let v = finish_session(&mut conn, &session.id, SessionStatus::Closed, Utc::now())
            .await
            .unwrap();
        assert_eq!(v, Some(3));

        assert_eq!(touch_open_session(&mut conn, &session.id, Utc::now()).await.unwrap(), None);
        assert_eq!(
            finish_session(&mut conn, &session.id, SessionStatus::Cancelled, Utc::now())
                .await
                .unwrap(),
            None
        );

        let stored = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Closed);
        assert!(stored.ended_at.is_some());
        assert_eq!(stored.version, 3);
    }

    #[tokio::test]
    async fn test_items_and_payments_round_trip() {
        let (db, room) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let session = Session::open(Uuid::new_v4().to_string(), &room.id, None, Utc::now());
        insert_session(&mut conn, &session).await.unwrap();

        for (name, qty, price) in [("Massage", 1000, 30_000), ("Tea", 2000, 1_000)] {
            let item = SessionItem {
                id: Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                service_name: name.to_string(),
                quantity_thousandths: qty,
                unit_price_cents: price,
                added_at: Utc::now(),
            };
            insert_item(&mut conn, &item).await.unwrap();
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            method: "cash".to_string(),
            amount_cents: 32_000,
            paid_at: Utc::now(),
        };
        insert_payment(&mut conn, &payment).await.unwrap();

        let items = db.sessions().get_items(&session.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].service_name, "Massage");
        assert_eq!(items[1].line_total().unwrap().cents(), 2_000);

        let payments = db.sessions().get_payments(&session.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].id, payment.id);
        assert_eq!(payments[0].amount().to_string(), "320.00");
    }
}

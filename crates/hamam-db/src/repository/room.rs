//! # Room Repository
//!
//! Database operations for rooms.
//!
//! ## Status Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every status write is CONDITIONAL on the status it expects:            │
//! │                                                                         │
//! │  open session   available ──► occupied     WHERE status = 'available'  │
//! │  close/cancel   occupied  ──► available    WHERE status = 'occupied'   │
//! │  operator       (not occupied) ──► target  WHERE status != 'occupied'  │
//! │                                                                         │
//! │  Each write bumps `version` and returns the new value (RETURNING),     │
//! │  or None when the condition did not hold.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take a `&mut SqliteConnection` so the same SQL runs
//! on a pooled connection ([`RoomRepository`]) or inside a
//! [`LedgerTx`](crate::LedgerTx).

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use hamam_core::{Room, RoomStatus};

const ROOM_COLUMNS: &str = "id, name, status, version, updated_at";

// =============================================================================
// Queries
// =============================================================================

pub(crate) async fn fetch_room(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Room>> {
    let room = sqlx::query_as::<_, Room>(&format!(
        "SELECT {} FROM rooms WHERE id = ?1",
        ROOM_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(room)
}

pub(crate) async fn fetch_room_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> DbResult<Option<Room>> {
    let room = sqlx::query_as::<_, Room>(&format!(
        "SELECT {} FROM rooms WHERE name = ?1",
        ROOM_COLUMNS
    ))
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(room)
}

pub(crate) async fn list_rooms(conn: &mut SqliteConnection) -> DbResult<Vec<Room>> {
    let rooms = sqlx::query_as::<_, Room>(&format!(
        "SELECT {} FROM rooms ORDER BY name",
        ROOM_COLUMNS
    ))
    .fetch_all(conn)
    .await?;

    Ok(rooms)
}

pub(crate) async fn insert_room(conn: &mut SqliteConnection, room: &Room) -> DbResult<()> {
    debug!(room_id = %room.id, name = %room.name, "Inserting room");

    sqlx::query(
        r#"
        INSERT INTO rooms (id, name, status, version, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&room.id)
    .bind(&room.name)
    .bind(room.status)
    .bind(room.version)
    .bind(room.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Moves a room from `from` to `to`. Returns the new version, or `None` if
/// the room is missing or no longer in `from`.
pub(crate) async fn transition_room_status(
    conn: &mut SqliteConnection,
    id: &str,
    from: RoomStatus,
    to: RoomStatus,
    now: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE rooms SET
            status = ?3,
            version = version + 1,
            updated_at = ?4
        WHERE id = ?1 AND status = ?2
        RETURNING version
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .fetch_optional(conn)
    .await?;

    Ok(version)
}

/// Operator status write. Never touches an occupied room.
pub(crate) async fn set_unoccupied_status(
    conn: &mut SqliteConnection,
    id: &str,
    to: RoomStatus,
    now: DateTime<Utc>,
) -> DbResult<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE rooms SET
            status = ?2,
            version = version + 1,
            updated_at = ?3
        WHERE id = ?1 AND status != 'occupied'
        RETURNING version
        "#,
    )
    .bind(id)
    .bind(to)
    .bind(now)
    .fetch_optional(conn)
    .await?;

    Ok(version)
}

// =============================================================================
// Repository
// =============================================================================

/// Read-side and provisioning access to rooms over the pool.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    /// Creates a new RoomRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    /// Gets a room by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Room>> {
        let mut conn = self.pool.acquire().await?;
        fetch_room(&mut conn, id).await
    }

    /// Gets a room by its display name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Room>> {
        let mut conn = self.pool.acquire().await?;
        fetch_room_by_name(&mut conn, name).await
    }

    /// Lists all rooms ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Room>> {
        let mut conn = self.pool.acquire().await?;
        list_rooms(&mut conn).await
    }

    /// Inserts a room (used by seeding and tests).
    pub async fn insert(&self, room: &Room) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_room(&mut conn, room).await
    }

    /// Counts provisioned rooms.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

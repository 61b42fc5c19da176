//! # Session Engine
//!
//! The transaction boundary of the bathhouse POS. Every operation runs one
//! ledger transaction, commits, and only then notifies observers.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  validate input ──► begin ──► read ──► state rule ──► conditional write │
//! │   (no store)                           (hamam-core)    (hamam-db)       │
//! │                                                              │          │
//! │                                                           commit        │
//! │                                                              │          │
//! │                          ┌───────────────────────────────────┤          │
//! │                          ▼                                   ▼          │
//! │                   ReceiptSink::deliver               EventSink::publish │
//! │                   (close only, reported)             (fire and forget)  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session State Machine
//! ```text
//!                 open_session
//!                      │
//!                      ▼
//!                 ┌─────────┐  close_session (balance == 0)  ┌──────────┐
//!                 │  OPEN   │ ─────────────────────────────► │  CLOSED  │
//!                 └─────────┘                                └──────────┘
//!                      │       cancel_session                ┌───────────┐
//!                      └───────────────────────────────────► │ CANCELLED │
//!                                                            └───────────┘
//! ```
//!
//! Room occupancy follows the session: `open_session` moves the room
//! available → occupied, close/cancel move it occupied → available. Both
//! writes are conditional, so an operator status set in between is never
//! overwritten.
//!
//! Each call is a single atomic attempt. Losing a race yields
//! `RoomAlreadyOccupied`, `SessionNotOpen` or `Conflict`; retrying is the
//! caller's decision.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hamam_core::validation::{
    normalize_customer_label, normalize_payment_method, validate_payment_amount, validate_quantity,
    validate_service_name, validate_unit_price,
};
use hamam_core::{
    CoreError, Money, Payment, Quantity, ReceiptSnapshot, Room, RoomStatus, Session, SessionItem,
    SessionStatus, SessionTotals,
};
use hamam_db::{Database, LedgerTx};
use serde::Serialize;

use crate::config::{EngineConfig, ReceiptSinkKind, SessionPolicy};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventFanout, EventSink, SessionEvent};
use crate::receipt::{DiscardSink, FilePreviewSink, ReceiptOutcome, ReceiptSink};

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a successful close.
#[derive(Debug)]
pub struct CloseOutcome {
    /// The session as committed (status closed, end timestamp set).
    pub session: Session,

    /// The frozen receipt and whether the sink accepted it.
    pub receipt: ReceiptOutcome,
}

/// A session with its rows and freshly computed totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDetail {
    pub session: Session,
    pub items: Vec<SessionItem>,
    pub payments: Vec<Payment>,
    pub totals: SessionTotals,
}

/// What a terminal transition committed.
struct Finished {
    session: Session,
    room: Option<(Room, Option<i64>)>,
    /// Built before commit for closes, `None` for cancels.
    receipt: Option<ReceiptSnapshot>,
}

// =============================================================================
// Engine
// =============================================================================

/// Orchestrates session and room transitions over the ledger store.
///
/// Cheap to clone; clones share the pool, the event sink and the receipt
/// sink.
#[derive(Clone)]
pub struct SessionEngine {
    db: Database,
    events: Arc<dyn EventSink>,
    receipts: Arc<dyn ReceiptSink>,
    policy: SessionPolicy,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("db", &self.db)
            .field("receipts", &self.receipts.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SessionEngine {
    pub fn new(db: Database, events: Arc<dyn EventSink>, receipts: Arc<dyn ReceiptSink>) -> Self {
        SessionEngine {
            db,
            events,
            receipts,
            policy: SessionPolicy::default(),
        }
    }

    /// Replaces the session policy.
    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wires database, fan-out and receipt sink from configuration.
    ///
    /// The returned [`EventFanout`] is the one the engine publishes to;
    /// observers subscribe on it.
    pub async fn from_config(config: &EngineConfig) -> EngineResult<(Self, EventFanout)> {
        config.validate()?;

        let db = Database::new(config.to_db_config()).await?;
        let fanout = EventFanout::new(config.events.channel_capacity);

        let receipts: Arc<dyn ReceiptSink> = match config.receipts.sink {
            ReceiptSinkKind::File => Arc::new(FilePreviewSink::new(&config.receipts.preview_dir)),
            ReceiptSinkKind::Discard => Arc::new(DiscardSink),
        };

        info!(
            db = %config.database.path.display(),
            receipt_sink = receipts.name(),
            channel_capacity = config.events.channel_capacity,
            "Session engine configured"
        );

        let engine =
            SessionEngine::new(db, Arc::new(fanout.clone()), receipts).with_policy(config.sessions);

        Ok((engine, fanout))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Opens a session on a room and marks the room occupied.
    ///
    /// ## Errors
    /// - `RoomNotFound` for an unknown room
    /// - `RoomAlreadyOccupied` if the room has an open session, including
    ///   when a concurrent open wins the race
    /// - `RoomUnavailable` if the room is in cleaning or maintenance
    pub async fn open_session(
        &self,
        room_id: &str,
        customer_label: Option<&str>,
    ) -> EngineResult<Session> {
        let customer_label = normalize_customer_label(customer_label)?;

        let mut tx = self.db.begin().await?;

        let room = tx
            .room(room_id)
            .await?
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;

        if let Some(existing) = tx.open_session_for_room(room_id).await? {
            debug!(room_id = %room_id, session_id = %existing.id, "Room already has an open session");
            return Err(EngineError::room_occupied(room_id));
        }

        room.ensure_rentable()?;

        let now = Utc::now();
        let session = Session::open(Uuid::new_v4().to_string(), room_id, customer_label, now);

        tx.insert_session(&session).await.map_err(|e| {
            if e.is_open_session_violation() {
                EngineError::room_occupied(room_id)
            } else {
                EngineError::from(e)
            }
        })?;

        let room_version = tx
            .transition_room(room_id, RoomStatus::Available, RoomStatus::Occupied, now)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!("room {} changed status during open", room_id))
            })?;

        tx.commit().await?;

        info!(session_id = %session.id, room_id = %room_id, "Session opened");

        self.events.publish(SessionEvent::RoomUpdated {
            room_id: room_id.to_string(),
            status: RoomStatus::Occupied,
            version: room_version,
        });
        self.events.publish(SessionEvent::SessionOpened {
            session_id: session.id.clone(),
            room_id: room_id.to_string(),
            version: session.version,
        });

        Ok(session)
    }

    /// Appends a service line to an open session.
    pub async fn add_item(
        &self,
        session_id: &str,
        service_name: &str,
        quantity: Quantity,
        unit_price: Money,
    ) -> EngineResult<SessionItem> {
        let service_name = validate_service_name(service_name)?;
        validate_quantity(quantity)?;
        validate_unit_price(unit_price)?;

        let mut tx = self.db.begin().await?;
        let now = Utc::now();
        let version = Self::touch_open(&mut tx, session_id, now).await?;

        let item = SessionItem {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            service_name,
            quantity_thousandths: quantity.thousandths(),
            unit_price_cents: unit_price.cents(),
            added_at: now,
        };
        let line_total = item.line_total()?;
        tx.insert_item(&item).await?;
        tx.commit().await?;

        debug!(
            session_id = %session_id,
            service = %item.service_name,
            quantity = %quantity,
            line_total = %line_total,
            "Item added"
        );

        self.events.publish(SessionEvent::SessionUpdated {
            session_id: session_id.to_string(),
            version,
        });

        Ok(item)
    }

    /// Records a payment against an open session.
    pub async fn add_payment(
        &self,
        session_id: &str,
        method: &str,
        amount: Money,
    ) -> EngineResult<Payment> {
        let method = normalize_payment_method(method)?;
        validate_payment_amount(amount)?;

        let mut tx = self.db.begin().await?;
        let now = Utc::now();
        let version = Self::touch_open(&mut tx, session_id, now).await?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            method,
            amount_cents: amount.cents(),
            paid_at: now,
        };
        tx.insert_payment(&payment).await?;
        tx.commit().await?;

        debug!(session_id = %session_id, method = %payment.method, amount = %amount, "Payment recorded");

        self.events.publish(SessionEvent::SessionUpdated {
            session_id: session_id.to_string(),
            version,
        });

        Ok(payment)
    }

    /// Settles a session whose balance is exactly zero and frees its room.
    ///
    /// ## When This Fails
    /// - `SessionNotFound` / `SessionNotOpen`, checked before the balance
    /// - `BalanceNotZero` with the three totals when items and payments
    ///   differ by any amount
    ///
    /// The receipt is delivered after commit. A delivery failure is logged
    /// and returned in [`CloseOutcome::receipt`]; the session stays closed.
    pub async fn close_session(&self, session_id: &str) -> EngineResult<CloseOutcome> {
        let mut finished = self.finish(session_id, SessionStatus::Closed).await?;

        let snapshot = finished.receipt.take().ok_or_else(|| {
            EngineError::Conflict(format!("session {} closed without a receipt", session_id))
        })?;
        let receipt = self.deliver(snapshot).await;

        self.events.publish(SessionEvent::SessionClosed {
            session_id: finished.session.id.clone(),
            room_id: finished.session.room_id.clone(),
            version: finished.session.version,
        });
        self.publish_room_release(&finished);

        Ok(CloseOutcome {
            session: finished.session,
            receipt,
        })
    }

    /// Abandons an open session without a balance check and frees its room.
    ///
    /// With `reject_cancel_with_payments` set, a session holding payments
    /// fails `CancelWithPayments`.
    pub async fn cancel_session(&self, session_id: &str) -> EngineResult<Session> {
        let finished = self.finish(session_id, SessionStatus::Cancelled).await?;

        self.events.publish(SessionEvent::SessionCancelled {
            session_id: finished.session.id.clone(),
            room_id: finished.session.room_id.clone(),
            version: finished.session.version,
        });
        self.publish_room_release(&finished);

        Ok(finished.session)
    }

    /// Hands the receipt of a closed session to the sink again.
    ///
    /// The snapshot is rebuilt from the stored rows, which are append-only
    /// and frozen once the session is closed.
    pub async fn redeliver_receipt(&self, session_id: &str) -> EngineResult<ReceiptOutcome> {
        let mut tx = self.db.begin().await?;

        let session = Self::require_session(&mut tx, session_id).await?;
        session.ensure_closed()?;

        let room_name = tx.room(&session.room_id).await?.map(|room| room.name);
        let items = tx.items(session_id).await?;
        let payments = tx.payments(session_id).await?;
        tx.rollback().await?;

        let snapshot = ReceiptSnapshot::build(room_name, &session, &items, &payments)?;
        info!(session_id = %session_id, "Redelivering receipt");

        Ok(self.deliver(snapshot).await)
    }

    // =========================================================================
    // Room Operations
    // =========================================================================

    /// Operator status change between available, cleaning and maintenance.
    ///
    /// ## Errors
    /// - `InvalidRoomStatus` when asked to set `occupied`
    /// - `RoomAlreadyOccupied` while a session holds the room
    pub async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> EngineResult<Room> {
        if !status.is_operator_settable() {
            return Err(CoreError::InvalidRoomStatus { status }.into());
        }

        let mut tx = self.db.begin().await?;

        let room = tx
            .room(room_id)
            .await?
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;

        if room.status == RoomStatus::Occupied {
            return Err(EngineError::room_occupied(room_id));
        }

        if room.status == status {
            tx.rollback().await?;
            debug!(room_id = %room_id, status = %status, "Room status unchanged");
            return Ok(room);
        }

        let now = Utc::now();
        let version = tx
            .set_unoccupied_room_status(room_id, status, now)
            .await?
            .ok_or_else(|| EngineError::room_occupied(room_id))?;
        tx.commit().await?;

        info!(room_id = %room_id, from = %room.status, to = %status, "Room status changed");

        self.events.publish(SessionEvent::RoomUpdated {
            room_id: room_id.to_string(),
            status,
            version,
        });

        Ok(Room {
            status,
            version,
            updated_at: now,
            ..room
        })
    }

    // =========================================================================
    // Read Model
    // =========================================================================

    /// All rooms ordered by name.
    pub async fn rooms(&self) -> EngineResult<Vec<Room>> {
        Ok(self.db.rooms().list().await?)
    }

    pub async fn room(&self, room_id: &str) -> EngineResult<Room> {
        self.db
            .rooms()
            .get_by_id(room_id)
            .await?
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))
    }

    /// The open session on a room, if any.
    pub async fn open_session_for_room(&self, room_id: &str) -> EngineResult<Option<Session>> {
        self.room(room_id).await?;
        Ok(self.db.sessions().open_for_room(room_id).await?)
    }

    pub async fn open_sessions(&self) -> EngineResult<Vec<Session>> {
        Ok(self.db.sessions().list_open().await?)
    }

    /// Session, items, payments and totals read in one transaction.
    pub async fn session_detail(&self, session_id: &str) -> EngineResult<SessionDetail> {
        let mut tx = self.db.begin().await?;

        let session = Self::require_session(&mut tx, session_id).await?;
        let items = tx.items(session_id).await?;
        let payments = tx.payments(session_id).await?;
        tx.rollback().await?;

        let totals = SessionTotals::compute(&items, &payments)?;

        Ok(SessionDetail {
            session,
            items,
            payments,
            totals,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn require_session(tx: &mut LedgerTx, session_id: &str) -> EngineResult<Session> {
        tx.session(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    /// Checks the session is open and bumps its version inside `tx`.
    async fn touch_open(
        tx: &mut LedgerTx,
        session_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> EngineResult<i64> {
        let session = Self::require_session(tx, session_id).await?;
        session.ensure_open()?;

        tx.touch_open_session(session_id, now)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!("session {} closed concurrently", session_id))
            })
    }

    /// Shared body of close and cancel.
    ///
    /// ## Steps
    /// 1. Read session, items and payments in one transaction
    /// 2. Apply the close rule (balance) or the cancel policy
    /// 3. Conditionally finish the session and release the room
    /// 4. Build the receipt snapshot (close only), then commit
    async fn finish(&self, session_id: &str, status: SessionStatus) -> EngineResult<Finished> {
        let mut tx = self.db.begin().await?;

        let session = Self::require_session(&mut tx, session_id).await?;
        session.ensure_open()?;

        let items = tx.items(session_id).await?;
        let payments = tx.payments(session_id).await?;
        // overflowing rows refuse both close and cancel; dropping tx rolls back
        let totals = SessionTotals::compute(&items, &payments)?;

        let rule = match status {
            SessionStatus::Closed => totals.ensure_settled().map_err(EngineError::from),
            _ if self.policy.reject_cancel_with_payments && totals.payments_total.is_positive() => {
                Err(CoreError::CancelWithPayments {
                    session_id: session_id.to_string(),
                    payments_total: totals.payments_total,
                }
                .into())
            }
            _ => Ok(()),
        };
        if let Err(err) = rule {
            tx.rollback().await?;
            debug!(session_id = %session_id, balance = %totals.balance, error = %err, "Session finish refused");
            return Err(err);
        }

        let now = Utc::now();
        let mut finished = session.finish(status, now)?;
        let ended_at = finished.ended_at.unwrap_or(now);

        finished.version = tx
            .finish_session(session_id, status, ended_at)
            .await?
            .ok_or_else(|| {
                EngineError::Conflict(format!("session {} finished concurrently", session_id))
            })?;

        let room = match tx.room(&finished.room_id).await? {
            Some(room) => {
                let version = tx
                    .transition_room(&room.id, RoomStatus::Occupied, RoomStatus::Available, ended_at)
                    .await?;
                Some((room, version))
            }
            None => {
                warn!(session_id = %session_id, room_id = %finished.room_id, "Session room missing");
                None
            }
        };

        let receipt = match status {
            SessionStatus::Closed => {
                let room_name = room.as_ref().map(|(room, _)| room.name.clone());
                Some(ReceiptSnapshot::build(room_name, &finished, &items, &payments)?)
            }
            _ => None,
        };

        tx.commit().await?;

        info!(
            session_id = %session_id,
            room_id = %finished.room_id,
            status = %status,
            items_total = %totals.items_total,
            payments_total = %totals.payments_total,
            "Session finished"
        );

        Ok(Finished {
            session: finished,
            room,
            receipt,
        })
    }

    fn publish_room_release(&self, finished: &Finished) {
        if let Some((room, Some(version))) = &finished.room {
            self.events.publish(SessionEvent::RoomUpdated {
                room_id: room.id.clone(),
                status: RoomStatus::Available,
                version: *version,
            });
        }
    }

    async fn deliver(&self, snapshot: ReceiptSnapshot) -> ReceiptOutcome {
        let delivery = self.receipts.deliver(&snapshot).await;

        if let Err(err) = &delivery {
            warn!(
                session_id = %snapshot.session_id,
                sink = self.receipts.name(),
                error = %err,
                "Receipt delivery failed"
            );
        }

        ReceiptOutcome { snapshot, delivery }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Subscription;
    use crate::receipt::ReceiptError;
    use async_trait::async_trait;
    use hamam_db::DbConfig;
    use std::sync::Mutex;

    /// Keeps every delivered snapshot.
    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<ReceiptSnapshot>>,
    }

    #[async_trait]
    impl ReceiptSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, receipt: &ReceiptSnapshot) -> Result<(), ReceiptError> {
            self.delivered.lock().unwrap().push(receipt.clone());
            Ok(())
        }
    }

    async fn setup() -> (SessionEngine, Subscription, Arc<RecordingSink>, Room) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let room = Room {
            id: Uuid::new_v4().to_string(),
            name: "Kurna 1".to_string(),
            status: RoomStatus::Available,
            version: 1,
            updated_at: Utc::now(),
        };
        db.rooms().insert(&room).await.unwrap();

        let fanout = EventFanout::new(16);
        let sub = fanout.subscribe();
        let sink = Arc::new(RecordingSink::default());
        let engine = SessionEngine::new(db, Arc::new(fanout), sink.clone());

        (engine, sub, sink, room)
    }

    #[tokio::test]
    async fn test_open_marks_room_occupied() {
        let (engine, mut sub, _, room) = setup().await;

        let session = engine.open_session(&room.id, Some("  Ayse K. ")).await.unwrap();
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.customer_label.as_deref(), Some("Ayse K."));

        let room = engine.room(&room.id).await.unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);
        assert_eq!(room.version, 2);

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].topic(), "room_updated");
        assert_eq!(events[1].topic(), "session_opened");
    }

    #[tokio::test]
    async fn test_open_twice_fails_occupied() {
        let (engine, _sub, _, room) = setup().await;

        engine.open_session(&room.id, None).await.unwrap();
        let err = engine.open_session(&room.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::RoomAlreadyOccupied { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_unknown_room() {
        let (engine, _sub, _, _) = setup().await;
        let err = engine.open_session("nope", None).await.unwrap_err();
        assert!(matches!(err, EngineError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_room_in_maintenance() {
        let (engine, _sub, _, room) = setup().await;
        engine
            .set_room_status(&room.id, RoomStatus::Maintenance)
            .await
            .unwrap();

        let err = engine.open_session(&room.id, None).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::RoomUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_close_requires_zero_balance() {
        let (engine, _sub, sink, room) = setup().await;
        let session = engine.open_session(&room.id, None).await.unwrap();

        engine
            .add_item(&session.id, "Kese", Quantity::whole(1), Money::from_cents(15_000))
            .await
            .unwrap();

        let err = engine.close_session(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::BalanceNotZero { .. })
        ));
        assert!(sink.delivered.lock().unwrap().is_empty());

        engine
            .add_payment(&session.id, "Card", Money::from_cents(15_000))
            .await
            .unwrap();
        let outcome = engine.close_session(&session.id).await.unwrap();

        assert_eq!(outcome.session.status, SessionStatus::Closed);
        assert!(outcome.receipt.is_delivered());
        assert_eq!(outcome.receipt.snapshot.room_name.as_deref(), Some("Kurna 1"));
        assert_eq!(sink.delivered.lock().unwrap().len(), 1);
        assert_eq!(engine.room(&room.id).await.unwrap().status, RoomStatus::Available);
    }

    #[tokio::test]
    async fn test_cancel_policy() {
        let (engine, _sub, _, room) = setup().await;
        let engine = engine.with_policy(SessionPolicy {
            reject_cancel_with_payments: true,
        });

        let session = engine.open_session(&room.id, None).await.unwrap();
        engine
            .add_payment(&session.id, "cash", Money::from_cents(500))
            .await
            .unwrap();

        let err = engine.cancel_session(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::CancelWithPayments { .. })
        ));

        let detail = engine.session_detail(&session.id).await.unwrap();
        assert_eq!(detail.session.status, SessionStatus::Open);
    }

    #[tokio::test]
    async fn test_set_room_status() {
        let (engine, mut sub, _, room) = setup().await;

        let err = engine
            .set_room_status(&room.id, RoomStatus::Occupied)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::InvalidRoomStatus { .. })));

        let updated = engine
            .set_room_status(&room.id, RoomStatus::Cleaning)
            .await
            .unwrap();
        assert_eq!(updated.status, RoomStatus::Cleaning);
        assert_eq!(updated.version, 2);

        // Same status: no write, no event
        engine
            .set_room_status(&room.id, RoomStatus::Cleaning)
            .await
            .unwrap();
        assert_eq!(sub.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_set_status_of_occupied_room() {
        let (engine, _sub, _, room) = setup().await;
        engine.open_session(&room.id, None).await.unwrap();

        let err = engine
            .set_room_status(&room.id, RoomStatus::Cleaning)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::RoomAlreadyOccupied { .. })
        ));
    }

    #[tokio::test]
    async fn test_redeliver_requires_closed() {
        let (engine, _sub, sink, room) = setup().await;
        let session = engine.open_session(&room.id, None).await.unwrap();

        let err = engine.redeliver_receipt(&session.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::SessionNotClosed { .. })));

        engine.close_session(&session.id).await.unwrap();
        let outcome = engine.redeliver_receipt(&session.id).await.unwrap();
        assert!(outcome.is_delivered());
        assert_eq!(sink.delivered.lock().unwrap().len(), 2);
    }
}

//! # Event Fan-out
//!
//! Best-effort, non-durable notifications that a room or session changed.
//! Observers (front desk screens, room boards) re-query the engine on wake-up.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           EventFanout                                   │
//! │                                                                         │
//! │  SessionEngine (after commit)                                          │
//! │       │ publish(SessionEvent { entity, version })                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  versions: entity → highest version delivered                   │   │
//! │  │     older version?  ──► discarded (never go backwards)          │   │
//! │  │     closed/cancelled ──► entry dropped, id kept as tombstone    │   │
//! │  │                                                                 │   │
//! │  │  registry snapshot (short read lock)                            │   │
//! │  │     ├── observer 1: mpsc (bounded) ── try_send ── ok            │   │
//! │  │     ├── observer 2: mpsc (bounded) ── try_send ── full → drop   │   │
//! │  │     └── observer 3: mpsc (closed)  ── try_send ── prune         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  publish never awaits, never fails the transition that caused it.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A new [`Subscription`] only receives events published after it was
//! created. Dropping it unsubscribes.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, warn};
use ts_rs::TS;

use hamam_core::RoomStatus;

/// Default per-observer queue length.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// How many finished session ids the fan-out remembers to discard late events.
pub const FINISHED_SESSION_TOMBSTONES: usize = 1024;

// =============================================================================
// Events
// =============================================================================

/// A committed state change.
///
/// ## Wire Format
/// ```json
/// { "topic": "room_updated", "room_id": "…", "status": "occupied", "version": 2 }
/// { "topic": "session_closed", "session_id": "…", "room_id": "…", "version": 4 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum SessionEvent {
    RoomUpdated {
        room_id: String,
        status: RoomStatus,
        version: i64,
    },
    SessionOpened {
        session_id: String,
        room_id: String,
        version: i64,
    },
    SessionUpdated {
        session_id: String,
        version: i64,
    },
    SessionClosed {
        session_id: String,
        room_id: String,
        version: i64,
    },
    SessionCancelled {
        session_id: String,
        room_id: String,
        version: i64,
    },
}

/// The entity an event is about. Ordering is per entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Room(String),
    Session(String),
}

impl SessionEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            SessionEvent::RoomUpdated { .. } => "room_updated",
            SessionEvent::SessionOpened { .. } => "session_opened",
            SessionEvent::SessionUpdated { .. } => "session_updated",
            SessionEvent::SessionClosed { .. } => "session_closed",
            SessionEvent::SessionCancelled { .. } => "session_cancelled",
        }
    }

    /// True for the last event a session ever produces.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionClosed { .. } | SessionEvent::SessionCancelled { .. }
        )
    }

    pub fn entity(&self) -> EntityKey {
        match self {
            SessionEvent::RoomUpdated { room_id, .. } => EntityKey::Room(room_id.clone()),
            SessionEvent::SessionOpened { session_id, .. }
            | SessionEvent::SessionUpdated { session_id, .. }
            | SessionEvent::SessionClosed { session_id, .. }
            | SessionEvent::SessionCancelled { session_id, .. } => {
                EntityKey::Session(session_id.clone())
            }
        }
    }

    /// The entity version written by the transaction behind this event.
    pub fn version(&self) -> i64 {
        match self {
            SessionEvent::RoomUpdated { version, .. }
            | SessionEvent::SessionOpened { version, .. }
            | SessionEvent::SessionUpdated { version, .. }
            | SessionEvent::SessionClosed { version, .. }
            | SessionEvent::SessionCancelled { version, .. } => *version,
        }
    }
}

// =============================================================================
// Sink Trait
// =============================================================================

/// Where the engine sends committed events.
///
/// Implementations must not block: `publish` runs on the operation's task
/// right after commit.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SessionEvent);
}

// =============================================================================
// Fan-out
// =============================================================================

/// Per-entity ordering state.
///
/// Live entities keep their highest delivered version. A session's entry is
/// dropped on its terminal event and its id moves to a bounded tombstone
/// queue, so memory follows the number of open sessions and rooms rather
/// than every session ever seen. Once a tombstone is evicted, a very late
/// event for that session is delivered again; observers re-query anyway.
#[derive(Debug, Default)]
struct VersionTracker {
    latest: HashMap<EntityKey, i64>,
    tombstones: HashSet<String>,
    tombstone_order: VecDeque<String>,
}

impl VersionTracker {
    /// Records `event` and returns false if it is older than what was delivered.
    fn admit(&mut self, event: &SessionEvent) -> bool {
        let entity = event.entity();
        let version = event.version();

        if let EntityKey::Session(session_id) = &entity {
            if self.tombstones.contains(session_id) {
                debug!(topic = event.topic(), version, "Discarding event for finished session");
                return false;
            }
        }

        if let Some(&seen) = self.latest.get(&entity) {
            if version < seen {
                debug!(topic = event.topic(), version, seen, "Discarding stale event");
                return false;
            }
        }

        match entity {
            EntityKey::Session(session_id) if event.is_terminal() => {
                self.latest.remove(&EntityKey::Session(session_id.clone()));
                self.bury(session_id);
            }
            entity => {
                self.latest.insert(entity, version);
            }
        }

        true
    }

    fn bury(&mut self, session_id: String) {
        if self.tombstones.insert(session_id.clone()) {
            self.tombstone_order.push_back(session_id);
        }

        while self.tombstone_order.len() > FINISHED_SESSION_TOMBSTONES {
            if let Some(oldest) = self.tombstone_order.pop_front() {
                self.tombstones.remove(&oldest);
            }
        }
    }
}

struct FanoutInner {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<u64, mpsc::Sender<SessionEvent>>>,
    /// Held across a whole publish so two racing publishers cannot
    /// interleave out of order.
    versions: Mutex<VersionTracker>,
}

impl FanoutInner {
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.remove(&id).is_some()
    }
}

/// Registry of observers with explicit subscribe / unsubscribe.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct EventFanout {
    inner: Arc<FanoutInner>,
}

impl EventFanout {
    /// Creates a fan-out whose observers each get a queue of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        EventFanout {
            inner: Arc::new(FanoutInner {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
                subscribers: RwLock::new(HashMap::new()),
                versions: Mutex::new(VersionTracker::default()),
            }),
        }
    }

    /// Registers a new observer.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);

        self.inner
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, tx);

        debug!(subscriber_id = id, "Observer subscribed");

        Subscription {
            id,
            rx,
            fanout: Arc::downgrade(&self.inner),
        }
    }

    /// Removes an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            debug!(subscriber_id = id, "Observer unsubscribed");
        }
        removed
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        EventFanout::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl std::fmt::Debug for EventFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFanout")
            .field("capacity", &self.inner.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventSink for EventFanout {
    fn publish(&self, event: SessionEvent) {
        let mut versions = self
            .inner
            .versions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !versions.admit(&event) {
            return;
        }

        let subscribers: Vec<(u64, mpsc::Sender<SessionEvent>)> = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut gone = Vec::new();

        for (id, tx) in subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber_id = id,
                        topic = event.topic(),
                        "Observer queue full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => gone.push(id),
            }
        }

        drop(versions);

        for id in gone {
            if self.inner.remove(id) {
                debug!(subscriber_id = id, "Pruned closed observer");
            }
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// One observer's queue of events. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<SessionEvent>,
    fanout: Weak<FanoutInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. `None` once the fan-out is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Returns the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drains every event currently queued.
    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.fanout.upgrade() {
            inner.remove(self.id);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Racing operations on a file database with several pooled connections.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use hamam_core::{CoreError, Money, Quantity, Room, RoomStatus, SessionStatus};
use hamam_db::{Database, DbConfig};
use hamam_engine::{
    DiscardSink, EngineError, ErrorKind, EventFanout, SessionEngine, SessionEvent,
};

async fn file_engine(dir: &tempfile::TempDir) -> (SessionEngine, EventFanout, Room) {
    let config = DbConfig::new(dir.path().join("hamam.db"))
        .max_connections(4)
        .busy_timeout(Duration::from_millis(500));
    let db = Database::new(config).await.unwrap();

    let room = Room {
        id: Uuid::new_v4().to_string(),
        name: "Private Hamam 1".to_string(),
        status: RoomStatus::Available,
        version: 1,
        updated_at: Utc::now(),
    };
    db.rooms().insert(&room).await.unwrap();

    let fanout = EventFanout::new(256);
    let engine = SessionEngine::new(db, Arc::new(fanout.clone()), Arc::new(DiscardSink));
    (engine, fanout, room)
}

fn is_lost_race(err: &EngineError) -> bool {
    matches!(err, EngineError::Core(CoreError::RoomAlreadyOccupied { .. }))
        || err.kind() == ErrorKind::Conflict
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_open_admits_one_session() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _fanout, room) = file_engine(&dir).await;

    let a = {
        let engine = engine.clone();
        let room_id = room.id.clone();
        tokio::spawn(async move { engine.open_session(&room_id, Some("A")).await })
    };
    let b = {
        let engine = engine.clone();
        let room_id = room.id.clone();
        tokio::spawn(async move { engine.open_session(&room_id, Some("B")).await })
    };

    let results = vec![a.await.unwrap(), b.await.unwrap()];
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(is_lost_race(err), "unexpected error: {err:?}");
    }

    let open = engine.open_sessions().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, winners[0].id);
    assert_eq!(
        engine.room(&room.id).await.unwrap().status,
        RoomStatus::Occupied
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_items_are_all_accounted() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _fanout, room) = file_engine(&dir).await;
    let session = engine.open_session(&room.id, None).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        let session_id = session.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_item(
                    &session_id,
                    &format!("Tea {}", i),
                    Quantity::whole(1),
                    Money::from_cents(1_000),
                )
                .await
        }));
    }

    let mut added = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => added += 1,
            Err(err) => assert!(err.is_retryable(), "unexpected error: {err:?}"),
        }
    }

    let detail = engine.session_detail(&session.id).await.unwrap();
    assert!(added > 0);
    assert_eq!(detail.items.len(), added);
    assert_eq!(detail.totals.items_total, Money::from_cents(1_000 * added as i64));
    assert_eq!(detail.session.version, 1 + added as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_racing_item_never_leaves_unsettled_closed_session() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _fanout, room) = file_engine(&dir).await;
    let session = engine.open_session(&room.id, None).await.unwrap();

    let close = {
        let engine = engine.clone();
        let id = session.id.clone();
        tokio::spawn(async move { engine.close_session(&id).await })
    };
    let item = {
        let engine = engine.clone();
        let id = session.id.clone();
        tokio::spawn(async move {
            engine
                .add_item(&id, "Massage", Quantity::whole(1), Money::from_cents(30_000))
                .await
        })
    };

    let close = close.await.unwrap();
    let item = item.await.unwrap();

    let detail = engine.session_detail(&session.id).await.unwrap();
    match detail.session.status {
        SessionStatus::Closed => {
            assert!(close.is_ok());
            assert!(item.is_err());
            assert!(detail.totals.is_settled());
            assert!(detail.items.is_empty());
        }
        SessionStatus::Open => {
            assert!(close.is_err());
            assert!(item.is_ok());
            assert_eq!(detail.items.len(), 1);
        }
        SessionStatus::Cancelled => panic!("nobody cancelled"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_observer_never_sees_a_session_go_backwards() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, fanout, room) = file_engine(&dir).await;
    let session = engine.open_session(&room.id, None).await.unwrap();
    let mut board = fanout.subscribe();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let engine = engine.clone();
        let session_id = session.id.clone();
        handles.push(tokio::spawn(async move {
            engine
                .add_payment(&session_id, "cash", Money::from_cents(100))
                .await
        }));
    }
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let versions: Vec<i64> = board
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            SessionEvent::SessionUpdated { version, .. } => Some(version),
            _ => None,
        })
        .collect();

    assert!(!versions.is_empty());
    assert!(versions.windows(2).all(|w| w[0] < w[1]), "{versions:?}");
}

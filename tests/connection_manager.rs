mod support;

use bridgeos::connection;
use bridgeos::errors::{ConnectionError, UnbindOutcome};
use sqlx::PgPool;
use support::{make_manager, make_store, make_worker};

#[sqlx::test]
async fn bind_succeeds_and_is_visible_to_lookups(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-00001").await;
    let worker = make_worker(&store, "es").await;

    let conn = connection::bind(&store, manager.manager_id, worker.worker_id, 1)
        .await
        .expect("bind should succeed");

    assert_eq!(conn.manager_id, manager.manager_id);
    assert_eq!(conn.worker_id, worker.worker_id);
    assert_eq!(conn.bot_slot, 1);

    let by_slot = connection::get_active_for_manager_slot(&store, manager.manager_id, 1)
        .await
        .unwrap();
    assert_eq!(by_slot.unwrap().connection_id, conn.connection_id);

    let by_worker = connection::get_active_for_worker(&store, worker.worker_id)
        .await
        .unwrap();
    assert_eq!(by_worker.unwrap().connection_id, conn.connection_id);
}

#[sqlx::test]
async fn second_worker_on_same_manager_slot_is_rejected(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-00002").await;
    let worker_a = make_worker(&store, "es").await;
    let worker_b = make_worker(&store, "fr").await;

    connection::bind(&store, manager.manager_id, worker_a.worker_id, 2)
        .await
        .unwrap();

    let result = connection::bind(&store, manager.manager_id, worker_b.worker_id, 2).await;
    assert!(matches!(result, Err(ConnectionError::SlotOccupied)));
}

#[sqlx::test]
async fn worker_bound_twice_is_rejected(pool: PgPool) {
    let store = make_store(pool).await;
    let manager_a = make_manager(&store, "agriculture", "BRIDGE-00003").await;
    let manager_b = make_manager(&store, "hospitality", "BRIDGE-00004").await;
    let worker = make_worker(&store, "es").await;

    connection::bind(&store, manager_a.manager_id, worker.worker_id, 1)
        .await
        .unwrap();

    let result = connection::bind(&store, manager_b.manager_id, worker.worker_id, 1).await;
    assert!(matches!(result, Err(ConnectionError::WorkerAlreadyConnected)));
}

#[sqlx::test]
async fn bot_slot_out_of_range_is_rejected_before_hitting_the_database(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-00005").await;
    let worker = make_worker(&store, "es").await;

    let result = connection::bind(&store, manager.manager_id, worker.worker_id, 6).await;
    assert!(matches!(result, Err(ConnectionError::InvalidSlot)));
}

#[sqlx::test]
async fn unbind_is_idempotent_and_frees_the_slot_for_reuse(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-00006").await;
    let worker_a = make_worker(&store, "es").await;
    let worker_b = make_worker(&store, "fr").await;

    let conn = connection::bind(&store, manager.manager_id, worker_a.worker_id, 3)
        .await
        .unwrap();

    let first = connection::unbind(&store, conn.connection_id).await.unwrap();
    assert_eq!(first, UnbindOutcome::Disconnected);

    let second = connection::unbind(&store, conn.connection_id).await.unwrap();
    assert_eq!(second, UnbindOutcome::AlreadyDisconnected);

    // The slot and the first worker are both free again.
    connection::bind(&store, manager.manager_id, worker_b.worker_id, 3)
        .await
        .expect("slot should be reusable after unbind");
    connection::bind(&store, manager.manager_id, worker_a.worker_id, 4)
        .await
        .expect("worker should be reusable after unbind");
}

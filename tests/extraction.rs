mod support;

use bridgeos::connection;
use bridgeos::entities::Message;
use bridgeos::extraction;
use sqlx::PgPool;
use support::{make_manager, make_store, make_worker, EchoSummarizer};

#[sqlx::test]
async fn extract_is_empty_when_the_manager_has_no_active_connections(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-60001").await;
    let summarizer = EchoSummarizer;

    let result = extraction::extract(&store, &summarizer, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[sqlx::test]
async fn extract_is_empty_when_there_were_no_messages_in_the_window(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-60002").await;
    let worker = make_worker(&store, "es").await;
    connection::bind(&store, manager.manager_id, worker.worker_id, 1).await.unwrap();
    let summarizer = EchoSummarizer;

    let result = extraction::extract(&store, &summarizer, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[sqlx::test]
async fn extract_summarizes_every_message_across_active_connections(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-60003").await;
    let worker = make_worker(&store, "es").await;
    let conn = connection::bind(&store, manager.manager_id, worker.worker_id, 1).await.unwrap();

    Message::create(store.pool(), conn.connection_id, manager.manager_id, "Check the west field", "Revisa el campo oeste")
        .await
        .unwrap();
    Message::create(store.pool(), conn.connection_id, worker.worker_id, "Done, fence is fixed", "Listo, la cerca arreglada")
        .await
        .unwrap();

    let summarizer = EchoSummarizer;
    let result = extraction::extract(&store, &summarizer, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert!(result[0].contains("Check the west field"));
    assert!(result[1].contains("Done, fence is fixed"));
}

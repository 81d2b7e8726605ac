mod support;

use bridgeos::subscription::{self, Entitlement};
use bridgeos::usage;
use bridgeos::webhook;
use sqlx::PgPool;
use support::{make_manager, make_store};

#[sqlx::test]
async fn usage_increment_blocks_once_the_free_limit_is_reached(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-40001").await;

    let first = usage::increment(&store, manager.manager_id, 3)
        .await
        .unwrap()
        .expect("first message is under the limit");
    assert_eq!(first.messages_sent, 1);
    assert!(!first.is_blocked);

    let second = usage::increment(&store, manager.manager_id, 3)
        .await
        .unwrap()
        .expect("second message is under the limit");
    assert_eq!(second.messages_sent, 2);
    assert!(!second.is_blocked);

    let third = usage::increment(&store, manager.manager_id, 3)
        .await
        .unwrap()
        .expect("third message reaches the limit but still goes through");
    assert_eq!(third.messages_sent, 3);
    assert!(third.is_blocked);

    let fourth = usage::increment(&store, manager.manager_id, 3).await.unwrap();
    assert!(fourth.is_none(), "a message sent after the limit was reached must be rejected");
}

#[sqlx::test]
async fn reset_clears_the_counter_and_the_blocked_flag(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-40002").await;

    usage::increment(&store, manager.manager_id, 1).await.unwrap();
    usage::reset(&store, manager.manager_id).await.unwrap();

    let row = usage::get(&store, manager.manager_id).await.unwrap();
    assert_eq!(row.messages_sent, 0);
    assert!(!row.is_blocked);
}

#[sqlx::test]
async fn a_manager_with_no_subscription_row_is_not_entitled(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-40003").await;

    let entitlement = subscription::effective_for_manager(&store, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(entitlement, Entitlement::NotEntitled);
}

#[sqlx::test]
async fn an_active_webhook_event_grants_entitlement(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-40004").await;

    webhook::apply_event(
        &store,
        manager.manager_id,
        "subscription_created",
        Some("ext-1"),
        Some("https://billing.example/portal/1"),
        None,
        None,
    )
    .await
    .unwrap();

    let entitlement = subscription::effective_for_manager(&store, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(entitlement, Entitlement::Entitled);
}

#[sqlx::test]
async fn cancellation_is_entitled_until_the_period_end(pool: PgPool) {
    let store = make_store(pool).await;
    let manager = make_manager(&store, "agriculture", "BRIDGE-40005").await;

    webhook::apply_event(
        &store,
        manager.manager_id,
        "subscription_created",
        Some("ext-2"),
        None,
        None,
        None,
    )
    .await
    .unwrap();

    let future_end = chrono::Utc::now() + chrono::Duration::days(3);
    webhook::apply_event(
        &store,
        manager.manager_id,
        "subscription_cancelled",
        Some("ext-2"),
        None,
        None,
        Some(future_end),
    )
    .await
    .unwrap();

    let entitlement = subscription::effective_for_manager(&store, manager.manager_id, chrono::Utc::now())
        .await
        .unwrap();
    assert_eq!(entitlement, Entitlement::Entitled);

    let after_period_end = subscription::effective_for_manager(&store, manager.manager_id, future_end + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(after_period_end, Entitlement::NotEntitled);
}

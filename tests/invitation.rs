mod support;

use bridgeos::entities::User;
use bridgeos::invitation;
use sqlx::PgPool;
use support::{make_store, next_user_id};

#[sqlx::test]
async fn generate_produces_a_redeemable_bridge_code(pool: PgPool) {
    let store = make_store(pool).await;
    let user_id = next_user_id();
    User::upsert(store.pool(), user_id, "Manager", Some("en"), None).await.unwrap();

    let manager = invitation::generate(&store, user_id, "agriculture").await.unwrap();
    assert!(manager.code.starts_with("BRIDGE-"));

    let resolved = invitation::resolve_code(&store, &manager.code).await.unwrap();
    assert_eq!(resolved.unwrap().manager_id, manager.manager_id);
}

#[sqlx::test]
async fn resolve_code_is_none_for_an_unknown_code(pool: PgPool) {
    let store = make_store(pool).await;
    let resolved = invitation::resolve_code(&store, "BRIDGE-99999").await.unwrap();
    assert!(resolved.is_none());
}

#[sqlx::test]
async fn a_soft_deleted_managers_code_no_longer_resolves(pool: PgPool) {
    let store = make_store(pool).await;
    let user_id = next_user_id();
    User::upsert(store.pool(), user_id, "Manager", Some("en"), None).await.unwrap();
    let manager = invitation::generate(&store, user_id, "agriculture").await.unwrap();

    bridgeos::identity::soft_delete_manager(&store, manager.manager_id).await.unwrap();

    let resolved = invitation::resolve_code(&store, &manager.code).await.unwrap();
    assert!(resolved.is_none());
}

//! Identity & Roles (§4.2).
//!
//! Creation/soft-delete of users, managers and workers, plus the role
//! lookup that the rest of the system uses to decide whether an
//! incoming sender is acting as a manager or as a worker.

use sqlx::postgres::PgTransaction;

use crate::entities::{Connection, Manager, User, Worker};
use crate::errors::StoreError;
use crate::store::Store;

/// The single active role a user can hold. A user MAY carry both a
/// soft-deleted Manager row and an active Worker row (or vice versa) as
/// a consequence of a reset-and-switch-role flow; only the active one
/// is ever returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Manager,
    Worker,
    None,
}

/// Insert-or-update a user by primary key (§4.2 `upsert_user`).
pub async fn upsert_user(
    store: &Store,
    user_id: i64,
    display_name: &str,
    ui_language: Option<&str>,
    gender: Option<&str>,
) -> Result<User, StoreError> {
    User::upsert(store.pool(), user_id, display_name, ui_language, gender).await
}

/// Creates (or re-activates) a manager role for `user_id` (§4.2
/// `create_manager`).
pub async fn create_manager(
    store: &Store,
    user_id: i64,
    industry: &str,
    code: &str,
) -> Result<Manager, StoreError> {
    Manager::create(store.pool(), user_id, industry, code).await
}

/// Creates (or re-activates) a worker role for `user_id` (§4.2
/// `create_worker`).
pub async fn create_worker(store: &Store, user_id: i64) -> Result<Worker, StoreError> {
    Worker::create(store.pool(), user_id).await
}

/// Returns the single active role held by `user_id` (§4.2 `get_role`).
pub async fn get_role(store: &Store, user_id: i64) -> Result<Role, StoreError> {
    let manager = Manager::get_by_id(store.pool(), user_id).await?;
    if manager.as_ref().is_some_and(Manager::is_active) {
        return Ok(Role::Manager);
    }
    let worker = Worker::get_by_id(store.pool(), user_id).await?;
    if worker.as_ref().is_some_and(Worker::is_active) {
        return Ok(Role::Worker);
    }
    Ok(Role::None)
}

/// Soft-deletes the manager role for `user_id` and, in the same
/// transaction, disconnects every active connection that manager holds
/// (§4.2, §3 lifecycle summary).
pub async fn soft_delete_manager(store: &Store, user_id: i64) -> Result<(), StoreError> {
    store
        .with_tx(move |tx| {
            Box::pin(async move {
                Manager::soft_delete(&mut **tx, user_id).await?;
                disconnect_all_for_user(tx, user_id).await
            })
        })
        .await
}

/// Soft-deletes the worker role for `user_id` and disconnects its one
/// possible active connection (§4.2).
pub async fn soft_delete_worker(store: &Store, user_id: i64) -> Result<(), StoreError> {
    store
        .with_tx(move |tx| {
            Box::pin(async move {
                Worker::soft_delete(&mut **tx, user_id).await?;
                disconnect_all_for_user(tx, user_id).await
            })
        })
        .await
}

async fn disconnect_all_for_user(
    tx: &mut PgTransaction<'_>,
    user_id: i64,
) -> Result<(), StoreError> {
    let active = Connection::list_active_for_user(&mut **tx, user_id).await?;
    for connection in active {
        Connection::disconnect(&mut **tx, connection.connection_id).await?;
    }
    Ok(())
}

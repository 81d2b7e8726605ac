//! Connection Manager (§4.3) — the engineered core of the substrate.
//!
//! Binds a worker to a manager on a bot slot without ever taking an
//! application-level lock: the two partial unique indexes on
//! `connections` *are* the mutex. A `bind` either commits, in which case
//! every subsequent read against the same pair of indexes observes the
//! bound state, or it fails deterministically with the error naming the
//! invariant a concurrent bind already claimed.

use crate::entities::Connection;
use crate::errors::{ConnectionError, StoreError};
use crate::store::Store;

/// Binds `worker_id` to `manager_id` on `bot_slot`. No application
/// mutex is used and none is permitted — see the module docs.
pub async fn bind(
    store: &Store,
    manager_id: i64,
    worker_id: i64,
    bot_slot: i16,
) -> Result<Connection, ConnectionError> {
    if !(1..=5).contains(&bot_slot) {
        return Err(ConnectionError::InvalidSlot);
    }

    match Connection::insert_active(store.pool(), manager_id, worker_id, bot_slot).await {
        Ok(connection) => Ok(connection),
        Err(StoreError::UniqueViolation(constraint)) => Err(classify_unique_violation(&constraint)),
        Err(StoreError::Sqlx(sqlx::Error::Database(db_err))) if db_err.is_foreign_key_violation() => {
            Err(classify_fk_violation(db_err.constraint().unwrap_or_default()))
        }
        Err(other) => Err(ConnectionError::Store(other)),
    }
}

fn classify_unique_violation(constraint: &str) -> ConnectionError {
    if constraint == Connection::SLOT_UNIQUE_INDEX {
        ConnectionError::SlotOccupied
    } else if constraint == Connection::WORKER_UNIQUE_INDEX {
        ConnectionError::WorkerAlreadyConnected
    } else {
        // An invariant we don't have a name for — treat conservatively
        // as the slot conflict, the more common of the two races.
        ConnectionError::SlotOccupied
    }
}

fn classify_fk_violation(constraint: &str) -> ConnectionError {
    if constraint.contains("worker") {
        ConnectionError::WorkerGone
    } else {
        ConnectionError::ManagerGone
    }
}

/// Idempotent disconnect (§4.3 `unbind`). Returns
/// [`crate::errors::UnbindOutcome::AlreadyDisconnected`] rather than an
/// error when called twice.
pub async fn unbind(
    store: &Store,
    connection_id: i64,
) -> Result<crate::errors::UnbindOutcome, StoreError> {
    match Connection::disconnect(store.pool(), connection_id).await? {
        Some(_) => Ok(crate::errors::UnbindOutcome::Disconnected),
        None => Ok(crate::errors::UnbindOutcome::AlreadyDisconnected),
    }
}

pub async fn get_active_for_manager_slot(
    store: &Store,
    manager_id: i64,
    bot_slot: i16,
) -> Result<Option<Connection>, StoreError> {
    Connection::get_active_for_manager_slot(store.pool(), manager_id, bot_slot).await
}

pub async fn get_active_for_worker(
    store: &Store,
    worker_id: i64,
) -> Result<Option<Connection>, StoreError> {
    Connection::get_active_for_worker(store.pool(), worker_id).await
}

/// Up to 5 active connections for a manager (§4.3).
pub async fn list_active_for_manager(
    store: &Store,
    manager_id: i64,
) -> Result<Vec<Connection>, StoreError> {
    Connection::list_active_for_manager(store.pool(), manager_id).await
}

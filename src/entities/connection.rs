use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Disconnected,
}

/// `(connection_id PK, manager_id, worker_id, bot_slot, status, connected_at, disconnected_at?)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connection {
    pub connection_id: i64,
    pub manager_id: i64,
    pub worker_id: i64,
    pub bot_slot: i16,
    pub status: ConnectionStatus,
    pub connected_at: DateTime<Utc>,
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Name of the partial unique index on `(manager_id, bot_slot)`.
    pub const SLOT_UNIQUE_INDEX: &'static str = "connections_manager_slot_active_uidx";
    /// Name of the partial unique index on `worker_id`.
    pub const WORKER_UNIQUE_INDEX: &'static str = "connections_worker_active_uidx";

    /// Inserts a new active connection row. The two partial unique
    /// indexes are the entire concurrency control: this call either
    /// succeeds or fails with a unique-violation naming one of the two
    /// indexes above — there is no read-then-write here, by design
    /// (§4.3, §9).
    pub async fn insert_active<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        worker_id: i64,
        bot_slot: i16,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO connections (manager_id, worker_id, bot_slot, status)
            VALUES ($1, $2, $3, 'active')
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .bind(worker_id)
        .bind(bot_slot)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Idempotent disconnect. Returns the updated row, or `None` if the
    /// connection was already disconnected (§4.3 `unbind`).
    pub async fn disconnect<'c>(
        executor: impl PgExecutor<'c>,
        connection_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE connections
            SET status = 'disconnected', disconnected_at = now()
            WHERE connection_id = $1 AND status = 'active'
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_by_id<'c>(
        executor: impl PgExecutor<'c>,
        connection_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM connections WHERE connection_id = $1")
            .bind(connection_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }

    pub async fn get_active_for_manager_slot<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        bot_slot: i16,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM connections WHERE manager_id = $1 AND bot_slot = $2 AND status = 'active'",
        )
        .bind(manager_id)
        .bind(bot_slot)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_active_for_worker<'c>(
        executor: impl PgExecutor<'c>,
        worker_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM connections WHERE worker_id = $1 AND status = 'active'",
        )
        .bind(worker_id)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Up to 5 active connections for a manager (one per slot).
    pub async fn list_active_for_manager<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<Vec<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM connections WHERE manager_id = $1 AND status = 'active' ORDER BY bot_slot",
        )
        .bind(manager_id)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }

    /// All active connections a user participates in, manager or worker
    /// side — used by the soft-delete cascade (§4.2) which must
    /// disconnect every connection a deactivated user held, regardless
    /// of role.
    pub async fn list_active_for_user<'c>(
        executor: impl PgExecutor<'c>,
        user_id: i64,
    ) -> Result<Vec<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM connections WHERE (manager_id = $1 OR worker_id = $1) AND status = 'active'",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }

    /// `sender_id` must equal the manager or the worker of this
    /// connection (§3 Message invariant, P2).
    pub fn involves(&self, user_id: i64) -> bool {
        self.manager_id == user_id || self.worker_id == user_id
    }
}

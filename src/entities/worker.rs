use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(worker_id PK = user_id, created_at, deleted_at?)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Worker {
    pub worker_id: i64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Worker {
    /// Idempotent create: re-activation after soft delete clears
    /// `deleted_at` (§4.2).
    pub async fn create<'c>(
        executor: impl PgExecutor<'c>,
        worker_id: i64,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO workers (worker_id, deleted_at)
            VALUES ($1, NULL)
            ON CONFLICT (worker_id) DO UPDATE SET deleted_at = NULL
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_by_id<'c>(
        executor: impl PgExecutor<'c>,
        worker_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM workers WHERE worker_id = $1")
            .bind(worker_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }

    pub async fn soft_delete<'c>(
        executor: impl PgExecutor<'c>,
        worker_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE workers SET deleted_at = now() WHERE worker_id = $1")
            .bind(worker_id)
            .execute(executor)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

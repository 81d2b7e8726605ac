use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(manager_id PK = user_id, code UNIQUE-WHEN-ACTIVE, industry, created_at, deleted_at?)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Manager {
    pub manager_id: i64,
    pub code: String,
    pub industry: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Manager {
    /// Name of the partial unique index on `code`, used by
    /// [`crate::errors::StoreError`] to recognize a collision.
    pub const CODE_UNIQUE_INDEX: &'static str = "managers_code_active_uidx";

    /// Idempotent create: re-activation after soft delete clears
    /// `deleted_at` (§4.2).
    pub async fn create<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        industry: &str,
        code: &str,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO managers (manager_id, code, industry, deleted_at)
            VALUES ($1, $2, $3, NULL)
            ON CONFLICT (manager_id) DO UPDATE SET
                code = $2,
                industry = $3,
                deleted_at = NULL
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .bind(code)
        .bind(industry)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_by_id<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM managers WHERE manager_id = $1")
            .bind(manager_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }

    /// Returns the active manager owning `code`, or `None` if the code
    /// is unassigned or belongs only to a soft-deleted manager.
    pub async fn get_active_by_code<'c>(
        executor: impl PgExecutor<'c>,
        code: &str,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM managers WHERE code = $1 AND deleted_at IS NULL",
        )
        .bind(code)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Soft delete (§4.2 `soft_delete_manager`); the connection-cascade
    /// is the caller's (`identity::soft_delete_manager`) responsibility,
    /// kept out of this row-level function on purpose.
    pub async fn soft_delete<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE managers SET deleted_at = now() WHERE manager_id = $1")
            .bind(manager_id)
            .execute(executor)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// `(task_id PK, connection_id, description, description_translated?, status, created_at, completed_at?)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub task_id: i64,
    pub connection_id: i64,
    pub description: String,
    pub description_translated: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub async fn create<'c>(
        executor: impl PgExecutor<'c>,
        connection_id: i64,
        description: &str,
        description_translated: &str,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO tasks (connection_id, description, description_translated, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(description)
        .bind(description_translated)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_by_id<'c>(
        executor: impl PgExecutor<'c>,
        task_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM tasks WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }

    /// `pending -> completed` is one-way; re-running this on an
    /// already-completed task is a no-op that returns `None` so the
    /// caller can report `AlreadyCompleted` instead of an error (§4.5).
    pub async fn complete<'c>(
        executor: impl PgExecutor<'c>,
        task_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE tasks
            SET status = 'completed', completed_at = now()
            WHERE task_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(task_id)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Pending tasks, plus tasks completed within `since..now`, for the
    /// connections listed (§4.5 `list_for_manager`/`list_for_worker`).
    pub async fn list_for_connections<'c>(
        executor: impl PgExecutor<'c>,
        connection_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM tasks
            WHERE connection_id = ANY($1)
              AND (status = 'pending' OR completed_at >= $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(connection_ids)
        .bind(since)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }
}

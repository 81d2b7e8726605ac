use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "feedback_status", rename_all = "lowercase")]
pub enum FeedbackStatus {
    Unread,
    Read,
}

/// `(feedback_id PK, user_id, display_name?, handle?, message, created_at, status)` — §3.
/// Write-only from users; the admin read-model dashboard that consumes
/// this table is out of scope (§1).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Feedback {
    pub feedback_id: i64,
    pub user_id: i64,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub status: FeedbackStatus,
}

impl Feedback {
    pub async fn create<'c>(
        executor: impl PgExecutor<'c>,
        user_id: i64,
        display_name: Option<&str>,
        handle: Option<&str>,
        message: &str,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO feedback (user_id, display_name, handle, message, status)
            VALUES ($1, $2, $3, $4, 'unread')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(handle)
        .bind(message)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }
}

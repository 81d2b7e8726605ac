use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(manager_id PK, messages_sent, is_blocked, first_message_at?, last_message_at?)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageTracking {
    pub manager_id: i64,
    pub messages_sent: i32,
    pub is_blocked: bool,
    pub first_message_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl UsageTracking {
    /// Returns the tracker row, creating a zeroed one on first read if
    /// missing (§4.7 `get`).
    pub async fn get_or_create<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO usage_tracking (manager_id)
            VALUES ($1)
            ON CONFLICT (manager_id) DO UPDATE SET manager_id = usage_tracking.manager_id
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Single atomic statement that only increments while the manager is
    /// still under `free_limit` (§4.7 `increment`). The `ensured` CTE
    /// guarantees a row exists without itself counting as a message,
    /// then the `UPDATE` only fires `WHERE ... messages_sent < $2` — once
    /// an existing row's pre-increment count has already reached the
    /// limit, neither the insert nor the update touches a row and
    /// `RETURNING` yields nothing, so the caller that sent the message
    /// that reaches the limit still gets its row persisted, and only
    /// the next one after it is rejected.
    pub async fn increment<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        free_limit: i32,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            WITH ensured AS (
                INSERT INTO usage_tracking (manager_id)
                VALUES ($1)
                ON CONFLICT (manager_id) DO UPDATE SET manager_id = usage_tracking.manager_id
                RETURNING manager_id, messages_sent
            )
            UPDATE usage_tracking u
            SET
                messages_sent = u.messages_sent + 1,
                is_blocked = (u.messages_sent + 1) >= $2,
                first_message_at = COALESCE(u.first_message_at, now()),
                last_message_at = now()
            FROM ensured e
            WHERE u.manager_id = e.manager_id AND e.messages_sent < $2
            RETURNING u.*
            "#,
        )
        .bind(manager_id)
        .bind(free_limit)
        .fetch_optional(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Zeroes the counter and clears `is_blocked` (§4.7 `reset`).
    pub async fn reset<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO usage_tracking (manager_id, messages_sent, is_blocked)
            VALUES ($1, 0, false)
            ON CONFLICT (manager_id) DO UPDATE SET messages_sent = 0, is_blocked = false
            "#,
        )
        .bind(manager_id)
        .execute(executor)
        .await
        .map_err(StoreError::from)?;
        Ok(())
    }
}

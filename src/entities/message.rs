use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(message_id PK, connection_id, sender_id, original_text, translated_text?, sent_at)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub message_id: i64,
    pub connection_id: i64,
    pub sender_id: i64,
    pub original_text: String,
    pub translated_text: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// A trimmed projection used by the translation-context assembler
/// (§4.6): only what the translator actually consumes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContextMessage {
    pub sender_id: i64,
    pub original_text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Persists a message. Called only after translation has succeeded
    /// and only just before delivery is attempted (§4.4 step 5) — a
    /// failed translation must leave no row here.
    pub async fn create<'c>(
        executor: impl PgExecutor<'c>,
        connection_id: i64,
        sender_id: i64,
        original_text: &str,
        translated_text: &str,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO messages (connection_id, sender_id, original_text, translated_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(connection_id)
        .bind(sender_id)
        .bind(original_text)
        .bind(translated_text)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    /// The last `k` messages of a connection, oldest first (§4.6).
    pub async fn last_k<'c>(
        executor: impl PgExecutor<'c>,
        connection_id: i64,
        k: i64,
    ) -> Result<Vec<ContextMessage>, StoreError> {
        sqlx::query_as::<_, ContextMessage>(
            r#"
            SELECT sender_id, original_text, sent_at FROM (
                SELECT sender_id, original_text, sent_at
                FROM messages
                WHERE connection_id = $1
                ORDER BY sent_at DESC
                LIMIT $2
            ) recent
            ORDER BY sent_at ASC
            "#,
        )
        .bind(connection_id)
        .bind(k)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }

    /// All messages sent across `connection_ids` within `[since, now]`,
    /// used by daily extraction (§4.10).
    pub async fn in_window<'c>(
        executor: impl PgExecutor<'c>,
        connection_ids: &[i64],
        since: DateTime<Utc>,
    ) -> Result<Vec<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM messages
            WHERE connection_id = ANY($1) AND sent_at >= $2
            ORDER BY sent_at ASC
            "#,
        )
        .bind(connection_ids)
        .bind(since)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(webhook_event_id PK, manager_id, event_kind, external_id?, event_timestamp?, received_at, applied, error?)` — reconciliation log, §4.9.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookEvent {
    pub webhook_event_id: i64,
    pub manager_id: i64,
    pub event_kind: String,
    pub external_id: Option<String>,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub applied: bool,
    pub error: Option<String>,
}

impl WebhookEvent {
    /// Records the outcome of one delivery, win or lose, so ops has a
    /// trail independent of the idempotent UPSERT on
    /// `subscriptions.manager_id` that actually drives state (§4.9).
    #[allow(clippy::too_many_arguments)]
    pub async fn record<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        event_kind: &str,
        external_id: Option<&str>,
        event_timestamp: Option<DateTime<Utc>>,
        applied: bool,
        error: Option<&str>,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO webhook_events
                (manager_id, event_kind, external_id, event_timestamp, applied, error)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .bind(event_kind)
        .bind(external_id)
        .bind(event_timestamp)
        .bind(applied)
        .bind(error)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    /// Most recent deliveries for a manager, newest first — used by
    /// support tooling to answer "did the webhook arrive" (§4.9).
    pub async fn recent_for_manager<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM webhook_events
            WHERE manager_id = $1
            ORDER BY received_at DESC
            LIMIT $2
            "#,
        )
        .bind(manager_id)
        .bind(limit)
        .fetch_all(executor)
        .await
        .map_err(StoreError::from)
    }
}

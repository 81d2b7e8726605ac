use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Free,
    Active,
    Cancelled,
    Expired,
    Paused,
}

/// `(subscription_id PK, manager_id UNIQUE, external_id?, status, customer_portal_url?, renews_at?, ends_at?, created_at, updated_at)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub subscription_id: i64,
    pub manager_id: i64,
    pub external_id: Option<String>,
    pub status: SubscriptionStatus,
    pub customer_portal_url: Option<String>,
    pub renews_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub async fn get_by_manager<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM subscriptions WHERE manager_id = $1")
            .bind(manager_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }

    /// Idempotent transition: the webhook receiver is the only caller
    /// (§4.8, §4.9). UPSERT on `manager_id` is what makes replaying the
    /// same authentic event a no-op (P6).
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_status<'c>(
        executor: impl PgExecutor<'c>,
        manager_id: i64,
        external_id: Option<&str>,
        status: SubscriptionStatus,
        customer_portal_url: Option<&str>,
        renews_at: Option<DateTime<Utc>>,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO subscriptions
                (manager_id, external_id, status, customer_portal_url, renews_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (manager_id) DO UPDATE SET
                external_id = COALESCE(EXCLUDED.external_id, subscriptions.external_id),
                status = EXCLUDED.status,
                customer_portal_url = COALESCE(EXCLUDED.customer_portal_url, subscriptions.customer_portal_url),
                renews_at = EXCLUDED.renews_at,
                ends_at = EXCLUDED.ends_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(manager_id)
        .bind(external_id)
        .bind(status)
        .bind(customer_portal_url)
        .bind(renews_at)
        .bind(ends_at)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }
}

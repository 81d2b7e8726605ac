use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

use crate::errors::StoreError;

/// `(user_id PK, display_name, ui_language, gender?, created_at, updated_at)` — §3.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub display_name: String,
    pub ui_language: String,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Insert-or-update by primary key (§4.2 `upsert_user`). Takes any
    /// `PgExecutor` so it can run standalone against the pool or as one
    /// statement inside a caller's transaction.
    pub async fn upsert<'c>(
        executor: impl PgExecutor<'c>,
        user_id: i64,
        display_name: &str,
        ui_language: Option<&str>,
        gender: Option<&str>,
    ) -> Result<Self, StoreError> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO users (user_id, display_name, ui_language, gender)
            VALUES ($1, $2, COALESCE($3, 'en'), $4)
            ON CONFLICT (user_id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                ui_language = COALESCE($3, users.ui_language),
                gender = COALESCE($4, users.gender),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(ui_language)
        .bind(gender)
        .fetch_one(executor)
        .await
        .map_err(StoreError::from)
    }

    pub async fn get_by_id<'c>(
        executor: impl PgExecutor<'c>,
        user_id: i64,
    ) -> Result<Option<Self>, StoreError> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await
            .map_err(StoreError::from)
    }
}

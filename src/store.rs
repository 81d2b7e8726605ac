//! Transactional persistence (§4.1 "Store").
//!
//! A thin wrapper around `sqlx::PgPool` exposing a single unit-of-work
//! entry point. Every mutation in this crate that carries an invariant
//! goes through [`Store::with_tx`]; no module is allowed to keep its own
//! ambient connection or pool — that pattern is exactly what `spec.md`
//! §9 calls out for re-architecture.

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::postgres::{PgPoolOptions, PgTransaction};
use sqlx::PgPool;

use crate::errors::StoreError;

/// Bounded connection pool plus migration lifecycle, the way
/// `sid3xyz-slircd-ng::db::Database::new` builds a `SqlitePoolOptions`
/// pool and runs embedded migrations before handing back a ready handle.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connects to `database_url`, applying the bounded pool defaults
    /// from §4.1 (min=5, max=20) unless overridden, then runs the
    /// embedded migrations.
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Test/embedding constructor for an already-open pool (used by
    /// `sqlx::test`-backed integration tests, which hand us a pool whose
    /// migrations have already been applied to a disposable schema).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `f` inside a transaction: commits on `Ok`, rolls back on
    /// `Err`. The connection is always returned to the pool — on the
    /// error path via the transaction's `Drop`, on the success path via
    /// `commit`. No call site outside this module ever begins or ends a
    /// transaction itself.
    pub async fn with_tx<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut PgTransaction<'_>) -> BoxFuture<'c, Result<T, E>>,
        E: From<StoreError>,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| E::from(StoreError::from(e)))?;

        let result = f(&mut tx).await;

        match result {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| E::from(StoreError::from(e)))?;
                Ok(value)
            }
            Err(err) => {
                // Rollback happens implicitly when `tx` drops.
                Err(err)
            }
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(constraint) = StoreError::violated_constraint(&err) {
            return StoreError::UniqueViolation(constraint);
        }
        match err {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            other => StoreError::Sqlx(other),
        }
    }
}

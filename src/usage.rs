//! Usage Tracker (§4.7).
//!
//! Thin service wrapper over [`crate::entities::UsageTracking`]; all of
//! the atomicity lives in the entity's single UPDATE statement, so this
//! module is just the naming surface `pipeline` calls through.

use crate::entities::UsageTracking;
use crate::errors::StoreError;
use crate::store::Store;

pub async fn get(store: &Store, manager_id: i64) -> Result<UsageTracking, StoreError> {
    UsageTracking::get_or_create(store.pool(), manager_id).await
}

/// Increments the counter and returns the updated row, or `None` if the
/// manager had already reached `free_limit` before this call — in which
/// case nothing was persisted and the caller must treat it as a reject,
/// not a silent no-op.
pub async fn increment(
    store: &Store,
    manager_id: i64,
    free_limit: i32,
) -> Result<Option<UsageTracking>, StoreError> {
    UsageTracking::increment(store.pool(), manager_id, free_limit).await
}

pub async fn reset(store: &Store, manager_id: i64) -> Result<(), StoreError> {
    UsageTracking::reset(store.pool(), manager_id).await
}

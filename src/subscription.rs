//! Subscription State Machine (§4.8).
//!
//! Persisted status plus `ends_at` are the only inputs; effective
//! entitlement is a pure function of `(status, ends_at, now)` (P5). No
//! internal code may mutate `subscriptions.status` outside of
//! [`crate::webhook::apply_event`] — this module only *reads*.

use chrono::{DateTime, Utc};

use crate::entities::{Subscription, SubscriptionStatus};
use crate::errors::StoreError;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Entitled,
    NotEntitled,
}

/// §4.8's table, as a pure function.
pub fn effective(subscription: Option<&Subscription>, now: DateTime<Utc>) -> Entitlement {
    let Some(subscription) = subscription else {
        return Entitlement::NotEntitled;
    };

    match subscription.status {
        SubscriptionStatus::Active => Entitlement::Entitled,
        SubscriptionStatus::Cancelled => match subscription.ends_at {
            Some(ends_at) if ends_at > now => Entitlement::Entitled,
            _ => Entitlement::NotEntitled,
        },
        SubscriptionStatus::Paused
        | SubscriptionStatus::Expired
        | SubscriptionStatus::Free => Entitlement::NotEntitled,
    }
}

/// Convenience wrapper that loads the subscription row and applies
/// [`effective`] against the current time.
pub async fn effective_for_manager(
    store: &Store,
    manager_id: i64,
    now: DateTime<Utc>,
) -> Result<Entitlement, StoreError> {
    let subscription = Subscription::get_by_manager(store.pool(), manager_id).await?;
    Ok(effective(subscription.as_ref(), now))
}

//! Webhook Receiver (§4.9).
//!
//! One POST path, HMAC-SHA-256 over the raw body, idempotent UPSERT on
//! `manager_id`. Mirrors the teacher's `#[handler]` + `Data<&PgPool>`
//! shape used in `api/routes/channels/messages/id/crosspost.rs` and
//! `api/routes/users/me/settings.rs`, with the signature check standing
//! in for the teacher's bearer-token extraction.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use poem::web::Data;
use poem::{handler, post, Body, EndpointExt, Request, Route};
use serde::Deserialize;
use sha2::Sha256;

use crate::collaborators::Transport;
use crate::entities::SubscriptionStatus;
use crate::errors::{StoreError, WebhookError};
use crate::store::Store;
use crate::subscription;

type HmacSha256 = Hmac<Sha256>;

/// Raw billing-provider envelope, deserialized only after the signature
/// has been verified over the untouched bytes (§4.9).
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event_kind: String,
    subscription_external_id: Option<String>,
    custom_fields: CustomFields,
    renews_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    customer_portal_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomFields {
    manager_id: Option<i64>,
}

/// Verifies `signature_hex` (an HMAC-SHA-256 hex digest) against `body`
/// keyed by `secret`, in constant time (`hmac::Mac::verify_slice`
/// already performs the comparison in constant time rather than a naive
/// `==` on decoded bytes).
fn verify_signature(secret: &[u8], body: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// `subscription_created|resumed|recovered → active`,
/// `cancelled → cancelled`, `expired → expired`,
/// `payment_failed|paused → paused`; anything else is acknowledged and
/// logged, never applied (§4.9).
fn target_status(event_kind: &str) -> Option<SubscriptionStatus> {
    match event_kind {
        "subscription_created"
        | "subscription_resumed"
        | "subscription_payment_recovered"
        | "subscription_payment_success" => Some(SubscriptionStatus::Active),
        "subscription_cancelled" => Some(SubscriptionStatus::Cancelled),
        "subscription_expired" => Some(SubscriptionStatus::Expired),
        "subscription_payment_failed" | "subscription_paused" => Some(SubscriptionStatus::Paused),
        "subscription_updated" | "subscription_plan_changed" => None,
        _ => None,
    }
}

/// Applies one authentic, parsed event. Idempotent: replaying the same
/// event is a no-op UPSERT on `manager_id` (P6).
pub async fn apply_event(
    store: &Store,
    manager_id: i64,
    event_kind: &str,
    external_id: Option<&str>,
    customer_portal_url: Option<&str>,
    renews_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<Option<crate::entities::Subscription>, StoreError> {
    let Some(status) = target_status(event_kind) else {
        log::info!("webhook: unhandled event_kind={event_kind} for manager_id={manager_id}");
        return Ok(None);
    };

    let subscription = crate::entities::Subscription::upsert_status(
        store.pool(),
        manager_id,
        external_id,
        status,
        customer_portal_url,
        renews_at,
        ends_at,
    )
    .await?;
    Ok(Some(subscription))
}

/// Shared state handed to the `poem` route via `Data`.
pub struct WebhookState {
    pub store: Store,
    pub webhook_secret: String,
    pub transport_by_slot: Box<dyn Fn(i16) -> Option<std::sync::Arc<dyn Transport>> + Send + Sync>,
}

#[handler]
async fn receive(req: &Request, body: Body, state: Data<&std::sync::Arc<WebhookState>>) -> poem::Result<()> {
    let state = state.0;

    let bytes = body.into_bytes().await.map_err(|e| {
        crate::errors::Error::from(WebhookError::MalformedPayload(e.to_string()))
    })?;

    let signature = req.header("X-Signature").ok_or_else(|| {
        crate::errors::Error::from(WebhookError::InvalidSignature)
    })?;

    if !verify_signature(state.webhook_secret.as_bytes(), &bytes, signature) {
        return Err(crate::errors::Error::from(WebhookError::InvalidSignature).into());
    }

    // §4.9: once the signature checks out the response is always 200;
    // everything past this point is logged, not propagated.
    if let Err(err) = handle_authenticated(state, &bytes).await {
        log::error!("webhook processing failed after authentic signature: {err}");
    }
    Ok(())
}

async fn handle_authenticated(state: &WebhookState, body: &[u8]) -> Result<(), WebhookError> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
    let manager_id = payload
        .custom_fields
        .manager_id
        .ok_or(WebhookError::MissingRoutingKey)?;

    let result = apply_event(
        &state.store,
        manager_id,
        &payload.event_kind,
        payload.subscription_external_id.as_deref(),
        payload.customer_portal_url.as_deref(),
        payload.renews_at,
        payload.ends_at,
    )
    .await;

    let error_text = result.as_ref().err().map(ToString::to_string);
    if let Err(err) = crate::entities::WebhookEvent::record(
        state.store.pool(),
        manager_id,
        &payload.event_kind,
        payload.subscription_external_id.as_deref(),
        payload.renews_at,
        result.is_ok(),
        error_text.as_deref(),
    )
    .await
    {
        log::warn!("failed to record webhook_events row for manager {manager_id}: {err}");
    }

    if let Some(subscription) = result? {
        notify_manager(state, manager_id, &subscription.status).await;
    }
    Ok(())
}

/// Best-effort out-of-band chat notification; a failure here never
/// affects the HTTP response (§4.9).
async fn notify_manager(state: &WebhookState, manager_id: i64, status: &SubscriptionStatus) {
    for slot in 1..=5i16 {
        let Some(transport) = (state.transport_by_slot)(slot) else {
            continue;
        };
        let text = format!("Subscription status changed: {status:?}");
        if let Err(err) = transport.send_text(manager_id, &text).await {
            log::warn!("failed to notify manager {manager_id} on slot {slot}: {err}");
        }
    }
}

/// The one POST path the webhook receiver exposes (§4.9, §6).
pub fn router(state: std::sync::Arc<WebhookState>) -> Route {
    Route::new().at("/webhooks/billing", post(receive)).data(state)
}

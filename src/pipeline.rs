//! Message Pipeline (§4.4) and the `**`-task dispatch point (§4.5, §9).
//!
//! `dispatch` is the single inbound entry point a bot process calls for
//! every text update; it decides message-vs-task and then either calls
//! [`deliver_text`] or [`crate::tasks::create`]. `deliver_text` itself
//! implements the six ordered steps exactly as named in the contract.

use std::time::Duration;

use tokio::time::timeout;

use crate::collaborators::{BillingPortal, Transport, TransportError, Translator};
use crate::connection;
use crate::context;
use crate::entities::{Connection, Manager, Message};
use crate::errors::{PipelineError, StoreError, TaskError};
use crate::identity::{self, Role};
use crate::store::Store;
use crate::subscription::{self, Entitlement};
use crate::tasks;

/// Translation call deadline (§5).
const TRANSLATION_TIMEOUT: Duration = Duration::from_secs(15);
/// Transport call deadline (§5).
const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(5);
/// Retry backoff schedule for transient translation failures (§5).
const TRANSLATION_BACKOFF: [Duration; 3] = [
    Duration::from_millis(100),
    Duration::from_millis(400),
    Duration::from_millis(1600),
];

/// Outcome of a successfully routed message. Carries the persisted row
/// and whether best-effort delivery to the recipient itself succeeded,
/// so the caller can decide whether to surface a "try again" notice
/// without ever rolling back the already-committed message (§4.4 step 5,
/// §7).
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub message: Message,
    pub delivered: bool,
}

/// What an inbound text turned into.
#[derive(Debug)]
pub enum DispatchOutcome {
    Message(DeliveryOutcome),
    Task(crate::entities::Task),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// The `**`-prefix parse rule (§4.5, §9): a wire-level convention, not a
/// control-flow construct. Two leading asterisks with no further
/// non-whitespace content route to task creation with an empty
/// description, which `tasks::create` itself rejects.
fn strip_task_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("**")
}

/// Single inbound entry point: routes to task creation or to
/// [`deliver_text`] depending on the `**` prefix rule.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch(
    store: &Store,
    translator: &dyn Translator,
    transport_by_slot: &dyn Fn(i16) -> Option<std::sync::Arc<dyn Transport>>,
    billing: &dyn BillingPortal,
    sender_id: i64,
    bot_slot: i16,
    text: &str,
    industry: &str,
    free_limit: i32,
    whitelisted: bool,
    context_size: usize,
) -> Result<DispatchOutcome, DispatchError> {
    if let Some(rest) = strip_task_prefix(text) {
        let connection = locate_connection(store, sender_id, bot_slot)
            .await?
            .ok_or(PipelineError::NotConnected)?;
        let manager = Manager::get_by_id(store.pool(), connection.manager_id)
            .await
            .map_err(PipelineError::from)?;
        let industry = manager
            .as_ref()
            .map(|m| m.industry.clone())
            .unwrap_or_else(|| industry.to_string());
        let worker_language = counterpart_language(store, &connection, sender_id)
            .await
            .map_err(PipelineError::from)?;

        let task = tasks::create(
            store,
            translator,
            &connection,
            sender_id,
            rest,
            &worker_language,
            &industry,
        )
        .await?;
        return Ok(DispatchOutcome::Task(task));
    }

    let outcome = deliver_text(
        store,
        translator,
        transport_by_slot,
        billing,
        sender_id,
        bot_slot,
        text,
        industry,
        free_limit,
        whitelisted,
        context_size,
    )
    .await?;
    Ok(DispatchOutcome::Message(outcome))
}

/// Steps 1-5 of §4.4, in order.
#[allow(clippy::too_many_arguments)]
pub async fn deliver_text(
    store: &Store,
    translator: &dyn Translator,
    transport_by_slot: &dyn Fn(i16) -> Option<std::sync::Arc<dyn Transport>>,
    billing: &dyn BillingPortal,
    sender_id: i64,
    bot_slot: i16,
    text: &str,
    default_industry: &str,
    free_limit: i32,
    whitelisted: bool,
    context_size: usize,
) -> Result<DeliveryOutcome, PipelineError> {
    // Step 1: locate the connection.
    let connection = locate_connection(store, sender_id, bot_slot)
        .await?
        .ok_or(PipelineError::NotConnected)?;

    let is_manager = connection.manager_id == sender_id;

    // Step 2: usage gating, manager-side only.
    if is_manager && !whitelisted {
        let entitlement = subscription::effective_for_manager(store, connection.manager_id, chrono::Utc::now())
            .await
            .map_err(PipelineError::from)?;
        if entitlement == Entitlement::NotEntitled {
            let allowed = crate::usage::increment(store, connection.manager_id, free_limit)
                .await
                .map_err(PipelineError::from)?;
            if allowed.is_none() {
                let checkout_url = billing
                    .checkout_url(connection.manager_id)
                    .await
                    .unwrap_or_else(|err| {
                        log::warn!("billing portal unavailable while building checkout URL: {err}");
                        String::new()
                    });
                return Err(PipelineError::LimitReached { checkout_url });
            }
        }
    }

    // Step 3: context assembly.
    let recent = context::last_k(store, connection.connection_id, context_size)
        .await
        .map_err(PipelineError::from)?;
    let translation_context: Vec<crate::collaborators::TranslationContextEntry> = recent
        .into_iter()
        .map(|entry| crate::collaborators::TranslationContextEntry {
            sender_language: entry.sender_language,
            text: entry.text,
        })
        .collect();

    let recipient_id = if is_manager {
        connection.worker_id
    } else {
        connection.manager_id
    };
    let from_language = sender_language(store, sender_id).await.map_err(PipelineError::from)?;
    let to_language = sender_language(store, recipient_id).await.map_err(PipelineError::from)?;
    let gender = sender_gender(store, recipient_id).await.map_err(PipelineError::from)?;
    let industry = Manager::get_by_id(store.pool(), connection.manager_id)
        .await
        .map_err(PipelineError::from)?
        .map(|m| m.industry)
        .unwrap_or_else(|| default_industry.to_string());

    // Step 4: translation, retried with backoff on transient failure.
    let translated = translate_with_retry(
        translator,
        text,
        &from_language,
        &to_language,
        gender.as_deref(),
        &industry,
        &translation_context,
    )
    .await?;

    // Step 5: persist, then deliver. The message is durable before any
    // attempt to reach the recipient; a delivery failure never rolls it
    // back (§4.4 step 5, §7).
    let message = Message::create(
        store.pool(),
        connection.connection_id,
        sender_id,
        text,
        &translated,
    )
    .await
    .map_err(PipelineError::from)?;

    let delivered = deliver_best_effort(transport_by_slot, bot_slot, recipient_id, &translated).await;

    Ok(DeliveryOutcome { message, delivered })
}

async fn locate_connection(
    store: &Store,
    sender_id: i64,
    bot_slot: i16,
) -> Result<Option<Connection>, PipelineError> {
    let role = identity::get_role(store, sender_id).await?;
    match role {
        Role::Manager => Ok(connection::get_active_for_manager_slot(store, sender_id, bot_slot).await?),
        Role::Worker => {
            let found = connection::get_active_for_worker(store, sender_id).await?;
            match found {
                Some(c) if c.bot_slot == bot_slot => Ok(Some(c)),
                Some(c) => {
                    log::warn!(
                        "worker {sender_id} messaged bot_slot={bot_slot} but is bound to slot {}",
                        c.bot_slot
                    );
                    Err(PipelineError::WrongSlot)
                }
                None => Ok(None),
            }
        }
        Role::None => Ok(None),
    }
}

async fn counterpart_language(
    store: &Store,
    connection: &Connection,
    actor_id: i64,
) -> Result<String, StoreError> {
    let counterpart = if connection.manager_id == actor_id {
        connection.worker_id
    } else {
        connection.manager_id
    };
    sender_language(store, counterpart).await
}

async fn sender_language(store: &Store, user_id: i64) -> Result<String, StoreError> {
    Ok(crate::entities::User::get_by_id(store.pool(), user_id)
        .await?
        .map(|u| u.ui_language)
        .unwrap_or_else(|| "en".to_string()))
}

async fn sender_gender(store: &Store, user_id: i64) -> Result<Option<String>, StoreError> {
    Ok(crate::entities::User::get_by_id(store.pool(), user_id)
        .await?
        .and_then(|u| u.gender))
}

async fn translate_with_retry(
    translator: &dyn Translator,
    text: &str,
    from_language: &str,
    to_language: &str,
    gender: Option<&str>,
    industry: &str,
    context: &[crate::collaborators::TranslationContextEntry],
) -> Result<String, PipelineError> {
    let mut last_err = None;
    for backoff in TRANSLATION_BACKOFF {
        let attempt = timeout(
            TRANSLATION_TIMEOUT,
            translator.translate(text, from_language, to_language, gender, industry, context),
        )
        .await;

        match attempt {
            Ok(Ok(translated)) if !translated.is_empty() => return Ok(translated),
            Ok(Ok(_)) => last_err = Some("translator returned an empty result".to_string()),
            Ok(Err(err)) => last_err = Some(err.to_string()),
            Err(_) => last_err = Some("translator request timed out".to_string()),
        }
        tokio::time::sleep(backoff).await;
    }
    Err(PipelineError::TranslationFailed(
        last_err.unwrap_or_else(|| "unknown translation failure".to_string()),
    ))
}

async fn deliver_best_effort(
    transport_by_slot: &dyn Fn(i16) -> Option<std::sync::Arc<dyn Transport>>,
    bot_slot: i16,
    recipient_id: i64,
    text: &str,
) -> bool {
    let Some(transport) = transport_by_slot(bot_slot) else {
        return false;
    };
    let result: Result<Result<(), TransportError>, _> =
        timeout(TRANSPORT_TIMEOUT, transport.send_text(recipient_id, text)).await;
    matches!(result, Ok(Ok(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_prefix_strips_leading_asterisks() {
        assert_eq!(strip_task_prefix("** Check cow 115"), Some(" Check cow 115"));
        assert_eq!(strip_task_prefix("hello"), None);
    }

    #[test]
    fn bare_task_prefix_has_no_non_whitespace_remainder() {
        let rest = strip_task_prefix("**").unwrap();
        assert!(rest.trim().is_empty());
    }

    #[tokio::test]
    async fn translate_with_retry_recovers_after_transient_failures() {
        use crate::collaborators::mocks::TranslatorMock;
        use mockall::Sequence;

        let mut translator = TranslatorMock::new();
        let mut seq = Sequence::new();
        translator
            .expect_translate()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _, _| Err(crate::collaborators::TranslatorError::Provider("transient".to_string())));
        translator
            .expect_translate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|text, from, to, _, _, _| Ok(format!("[{from}->{to}] {text}")));

        let translated = translate_with_retry(&translator, "Hello", "en", "es", None, "agriculture", &[])
            .await
            .expect("third attempt succeeds");
        assert_eq!(translated, "[en->es] Hello");
    }

    #[tokio::test]
    async fn deliver_best_effort_reports_success_and_failure_from_the_transport() {
        use crate::collaborators::mocks::TransportMock;
        use std::sync::Arc;

        let mut ok_mock = TransportMock::new();
        ok_mock.expect_send_text().returning(|_, _| Ok(()));
        let ok_transport: Arc<dyn Transport> = Arc::new(ok_mock);
        let ok_registry = move |slot: i16| if slot == 1 { Some(ok_transport.clone()) } else { None };
        assert!(deliver_best_effort(&ok_registry, 1, 42, "hola").await);

        let mut failing_mock = TransportMock::new();
        failing_mock
            .expect_send_text()
            .returning(|_, _| Err(TransportError::Provider("down".to_string())));
        let failing_transport: Arc<dyn Transport> = Arc::new(failing_mock);
        let failing_registry = move |slot: i16| if slot == 1 { Some(failing_transport.clone()) } else { None };
        assert!(!deliver_best_effort(&failing_registry, 1, 42, "hola").await);
    }
}

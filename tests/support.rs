//! Shared fixtures and fakes for the integration suite. Not a test file
//! itself — pulled in with `mod support;`.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bridgeos::collaborators::{
    BillingPortal, BillingPortalError, Summarizer, SummarizerError, Transport, TransportError,
    TranslationContextEntry, Translator, TranslatorError,
};
use bridgeos::entities::{Manager, User, Worker};
use bridgeos::store::Store;
use sqlx::PgPool;

static NEXT_USER_ID: AtomicI64 = AtomicI64::new(1);

/// Each test gets its own disposable numeric id range so fixtures never
/// collide within a single `#[sqlx::test]` database.
pub fn next_user_id() -> i64 {
    NEXT_USER_ID.fetch_add(1, Ordering::Relaxed)
}

pub async fn make_store(pool: PgPool) -> Store {
    Store::from_pool(pool)
}

pub async fn make_manager(store: &Store, industry: &str, code: &str) -> Manager {
    let user_id = next_user_id();
    User::upsert(store.pool(), user_id, "Manager", Some("en"), None)
        .await
        .unwrap();
    Manager::create(store.pool(), user_id, industry, code)
        .await
        .unwrap()
}

pub async fn make_worker(store: &Store, ui_language: &str) -> Worker {
    let user_id = next_user_id();
    User::upsert(store.pool(), user_id, "Worker", Some(ui_language), None)
        .await
        .unwrap();
    Worker::create(store.pool(), user_id).await.unwrap()
}

/// Appends `[from->to]` in front of the text instead of calling any real
/// provider, so tests can assert exactly what the pipeline asked for.
pub struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(
        &self,
        text: &str,
        from_language: &str,
        to_language: &str,
        _gender: Option<&str>,
        _industry: &str,
        _context: &[TranslationContextEntry],
    ) -> Result<String, TranslatorError> {
        Ok(format!("[{from_language}->{to_language}] {text}"))
    }
}

pub struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(
        &self,
        _text: &str,
        _from_language: &str,
        _to_language: &str,
        _gender: Option<&str>,
        _industry: &str,
        _context: &[TranslationContextEntry],
    ) -> Result<String, TranslatorError> {
        Err(TranslatorError::Provider("provider is down".to_string()))
    }
}

/// Records every delivered `(recipient_id, text)` pair for assertion.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, recipient_id: i64, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((recipient_id, text.to_string()));
        Ok(())
    }
}

pub struct UnreachableTransport;

#[async_trait]
impl Transport for UnreachableTransport {
    async fn send_text(&self, _recipient_id: i64, _text: &str) -> Result<(), TransportError> {
        Err(TransportError::Provider("no route to chat client".to_string()))
    }
}

pub struct FixedBillingPortal(pub &'static str);

#[async_trait]
impl BillingPortal for FixedBillingPortal {
    async fn checkout_url(&self, manager_id: i64) -> Result<String, BillingPortalError> {
        Ok(format!("{}?manager_id={manager_id}", self.0))
    }
}

/// Turns each `(sender_id, text)` pair into one bullet, ignoring
/// `ui_language`, so tests can assert the extraction saw exactly the
/// messages it was handed.
pub struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn extract(
        &self,
        _ui_language: &str,
        messages: &[(String, String)],
    ) -> Result<Vec<String>, SummarizerError> {
        Ok(messages.iter().map(|(sender, text)| format!("{sender}: {text}")).collect())
    }
}

//! External collaborators (§1 "Out of scope").
//!
//! The chat-platform transport, the LLM translator, the billing
//! provider's hosted checkout, the summarization provider, and the
//! localization subsystem are all interface-only here: a trait plus the
//! minimal implementation needed to exercise the pipeline end to end.
//! Real implementations live outside this crate's core contract.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("translator request timed out")]
    Timeout,
    #[error("translator returned an empty result")]
    Empty,
    #[error("translator call failed: {0}")]
    Provider(String),
}

/// One prior message of translation context, as handed to the
/// translator (§4.4 step 3, §4.6).
#[derive(Debug, Clone)]
pub struct TranslationContextEntry {
    pub sender_language: String,
    pub text: String,
}

/// Deterministic (for fixed inputs) text translator. Transient failures
/// are the caller's (`pipeline`) responsibility to retry (§4.4 step 4).
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        from_language: &str,
        to_language: &str,
        gender: Option<&str>,
        industry: &str,
        context: &[TranslationContextEntry],
    ) -> Result<String, TranslatorError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport call timed out")]
    Timeout,
    #[error("transport send failed: {0}")]
    Provider(String),
}

/// The chat-platform send surface, keyed implicitly by which bot slot's
/// client the caller dispatches through (§9 "Cross-bot messaging": a
/// capability, not a special control-flow construct).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, recipient_id: i64, text: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Error)]
pub enum BillingPortalError {
    #[error("billing provider call failed: {0}")]
    Provider(String),
}

/// Mints a checkout URL carrying `manager_id` in the custom-fields
/// channel (§7 "Quota" error handling).
#[async_trait]
pub trait BillingPortal: Send + Sync {
    async fn checkout_url(&self, manager_id: i64) -> Result<String, BillingPortalError>;
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer call failed: {0}")]
    Provider(String),
}

/// Daily-extraction summarization provider (§4.10). The precise prompt
/// wording is explicitly an Open Question in `spec.md` §9 and is not
/// part of the core contract; only the "extraction, not summarization"
/// instruction is passed through.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn extract(
        &self,
        ui_language: &str,
        messages: &[(String, String)],
    ) -> Result<Vec<String>, SummarizerError>;
}

/// Resolves an error key to user-facing text. The localization content
/// itself is out of scope (§1); this trait exists purely so error
/// handling never has to assume a concrete string table.
pub trait Localizer: Send + Sync {
    fn resolve(&self, ui_language: &str, key: &str) -> String;
}

/// A `Localizer` that returns the key unchanged, useful in tests and as
/// a last-resort fallback.
pub struct IdentityLocalizer;

impl Localizer for IdentityLocalizer {
    fn resolve(&self, _ui_language: &str, key: &str) -> String {
        key.to_string()
    }
}

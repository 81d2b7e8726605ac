//! Process configuration.
//!
//! The configuration *loader* is out of scope (see `spec.md` §1); what
//! lives here is just the shape of the recognized options from §6 and a
//! thin `from_env` constructor in the teacher's style of reading
//! environment variables through `dotenv` + `std::env`, rather than a
//! generic layered config framework.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One entry of the `industries` map (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Industry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub translation_provider: String,
    pub translation_context_size: usize,
    pub free_message_limit: i32,
    pub enforce_limits: bool,
    pub test_user_ids: Vec<i64>,
    pub industries: HashMap<String, Industry>,
    pub languages: Vec<String>,

    pub database_url: String,
    pub transport_token: String,
    pub translator_key: String,
    pub webhook_secret: String,

    pub pool_min_connections: u32,
    pub pool_max_connections: u32,
    pub pool_acquire_timeout_secs: u64,
}

impl Config {
    /// Default free-message allowance, used when `free_message_limit`
    /// is not set in the environment.
    pub const DEFAULT_FREE_MESSAGE_LIMIT: i32 = 8;
    /// Default translation context depth (§4.6).
    pub const DEFAULT_CONTEXT_SIZE: usize = 6;

    /// Builds configuration from environment variables, loading a
    /// `.env` file first if present (mirrors the teacher's `dotenv`
    /// dependency).
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();

        let test_user_ids = std::env::var("TEST_USER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("invalid TEST_USER_IDS: {e}"))?;

        let languages = std::env::var("LANGUAGES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let industries = match std::env::var("INDUSTRIES_TOML") {
            Ok(raw) => toml::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("invalid INDUSTRIES_TOML: {e}"))?,
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            translation_provider: std::env::var("TRANSLATION_PROVIDER")
                .unwrap_or_else(|_| "default".to_string()),
            translation_context_size: std::env::var("TRANSLATION_CONTEXT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_CONTEXT_SIZE),
            free_message_limit: std::env::var("FREE_MESSAGE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Self::DEFAULT_FREE_MESSAGE_LIMIT),
            enforce_limits: std::env::var("ENFORCE_LIMITS")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            test_user_ids,
            industries,
            languages,

            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            transport_token: std::env::var("TRANSPORT_TOKEN").unwrap_or_default(),
            translator_key: std::env::var("TRANSLATOR_KEY").unwrap_or_default(),
            webhook_secret: std::env::var("WEBHOOK_SECRET").unwrap_or_default(),

            pool_min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            pool_max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            pool_acquire_timeout_secs: std::env::var("DB_POOL_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        })
    }

    /// Whether `user_id` bypasses usage gating entirely (§4.4 step 2).
    pub fn is_whitelisted(&self, user_id: i64) -> bool {
        self.test_user_ids.contains(&user_id)
    }
}

/// Which logical bot slot this process owns, derived from `BOT_ID=bot1..bot5`
/// (§6 "Bot slot determination").
pub fn slot_from_bot_id(bot_id: &str) -> Option<i16> {
    let digit = bot_id.strip_prefix("bot")?;
    let slot: i16 = digit.parse().ok()?;
    if (1..=5).contains(&slot) {
        Some(slot)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_from_bot_id_parses_valid_slots() {
        assert_eq!(slot_from_bot_id("bot1"), Some(1));
        assert_eq!(slot_from_bot_id("bot5"), Some(5));
    }

    #[test]
    fn slot_from_bot_id_rejects_out_of_range_or_malformed() {
        assert_eq!(slot_from_bot_id("bot0"), None);
        assert_eq!(slot_from_bot_id("bot6"), None);
        assert_eq!(slot_from_bot_id("botX"), None);
        assert_eq!(slot_from_bot_id("worker1"), None);
    }
}

//! Daily Extraction (§4.10).
//!
//! On-demand, no caching: fetch the trailing 24h of messages across
//! every active connection of a manager and hand them to the
//! summarization provider with an extraction (not summarization)
//! instruction. The provider's own prompt wording is out of scope
//! (§1, §9 Open Questions).

use chrono::{DateTime, Duration, Utc};

use crate::collaborators::{Summarizer, SummarizerError};
use crate::entities::{Connection, Message, User};
use crate::errors::StoreError;
use crate::store::Store;

const WINDOW: Duration = Duration::hours(24);

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("summarizer call failed: {0}")]
    Summarizer(#[from] SummarizerError),
}

/// Returns a flat bullet list of action items, safety issues, and
/// equipment notes, in the manager's UI language. Empty when there were
/// no messages in the window.
pub async fn extract(
    store: &Store,
    summarizer: &dyn Summarizer,
    manager_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<String>, ExtractionError> {
    let connections = Connection::list_active_for_manager(store.pool(), manager_id).await?;
    if connections.is_empty() {
        return Ok(Vec::new());
    }

    let connection_ids: Vec<i64> = connections.iter().map(|c| c.connection_id).collect();
    let since = now - WINDOW;
    let messages = Message::in_window(store.pool(), &connection_ids, since).await?;
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let manager_language = User::get_by_id(store.pool(), manager_id)
        .await?
        .map(|u| u.ui_language)
        .unwrap_or_else(|| "en".to_string());

    let pairs: Vec<(String, String)> = messages
        .into_iter()
        .map(|m| (m.sender_id.to_string(), m.original_text))
        .collect();

    Ok(summarizer.extract(&manager_language, &pairs).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_24_hours() {
        assert_eq!(WINDOW, Duration::hours(24));
    }
}

//! Translation-Context Assembler (§4.6).
//!
//! Pure read side: given a connection and a depth `k`, returns the last
//! `k` messages ordered oldest-first. No deduplication, no filtering —
//! and Tasks never appear here, since they are not Messages.

use crate::entities::Message;
use crate::errors::StoreError;
use crate::store::Store;

/// One message as the translator sees it.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub sender_language: String,
    pub text: String,
}

/// Fetches the last `k` messages of `connection_id`, attaching each
/// sender's `ui_language` (the translator needs the language, not the
/// raw sender id). Empty when the connection has no prior messages.
pub async fn last_k(
    store: &Store,
    connection_id: i64,
    k: usize,
) -> Result<Vec<ContextEntry>, StoreError> {
    let rows = Message::last_k(store.pool(), connection_id, k as i64).await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let language = sqlx::query_scalar::<_, String>(
            "SELECT ui_language FROM users WHERE user_id = $1",
        )
        .bind(row.sender_id)
        .fetch_optional(store.pool())
        .await?
        .unwrap_or_else(|| "en".to_string());

        entries.push(ContextEntry {
            sender_language: language,
            text: row.original_text,
        });
    }
    Ok(entries)
}

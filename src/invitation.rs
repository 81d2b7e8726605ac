//! Invitation codes (§6) — `BRIDGE-DDDDD`, generated and redeemed
//! without ever taking an application-level lock: the same
//! `managers_code_active_uidx` partial unique index that backs
//! [`crate::connection`] backs this, too (P7).

use rand::Rng;

use crate::entities::Manager;
use crate::errors::StoreError;
use crate::store::Store;

const MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("could not generate a unique invitation code after {0} attempts")]
    CodeCollision(u32),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn random_suffix() -> String {
    let digits: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("{digits:05}")
}

/// `BRIDGE-DDDDD` for a fresh code, five decimal digits.
fn format_code(suffix: &str) -> String {
    format!("BRIDGE-{suffix}")
}

/// Creates (or re-activates) the manager role for `user_id`, probing for
/// a collision-free code with up to [`MAX_ATTEMPTS`] retries (§6, P7).
/// Each attempt is a single `INSERT ... ON CONFLICT` against
/// [`Manager::CODE_UNIQUE_INDEX`]; a collision is a normal outcome of
/// the race, not a programming error.
pub async fn generate(store: &Store, user_id: i64, industry: &str) -> Result<Manager, InvitationError> {
    for _ in 0..MAX_ATTEMPTS {
        let code = format_code(&random_suffix());
        match Manager::create(store.pool(), user_id, industry, &code).await {
            Ok(manager) => return Ok(manager),
            Err(StoreError::UniqueViolation(constraint)) if constraint == Manager::CODE_UNIQUE_INDEX => {
                continue;
            }
            Err(other) => return Err(InvitationError::from(other)),
        }
    }
    Err(InvitationError::CodeCollision(MAX_ATTEMPTS))
}

/// Parses the `invite_BRIDGE-DDDDD` payload of a start-link deep link
/// into the bare `BRIDGE-DDDDD` code (§6 "Invitation links").
pub fn parse_start_payload(payload: &str) -> Option<&str> {
    payload.strip_prefix("invite_")
}

/// Looks up the active manager owning `code`, the first half of
/// redemption; binding the worker is [`crate::connection::bind`]'s job.
pub async fn resolve_code(store: &Store, code: &str) -> Result<Option<Manager>, StoreError> {
    Manager::get_active_by_code(store.pool(), code).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bridge_code() {
        let code = format_code("00042");
        assert_eq!(code, "BRIDGE-00042");
    }

    #[test]
    fn random_suffix_is_always_five_digits() {
        for _ in 0..50 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), 5);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn parses_start_payload() {
        assert_eq!(parse_start_payload("invite_BRIDGE-12345"), Some("BRIDGE-12345"));
        assert_eq!(parse_start_payload("BRIDGE-12345"), None);
    }
}

//! Single-use password reset tokens. Only the SHA-256 of a token is stored.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::auth::repo_types::ResetTicket;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct ResetTokens {
    ttl: Duration,
}

impl ResetTokens {
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_minutes.saturating_mul(60)),
        }
    }

    /// 32 random bytes, hex encoded. Handed to the requester once.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    pub fn hash(plain: &str) -> String {
        hex::encode(Sha256::digest(plain.as_bytes()))
    }

    /// Ticket to persist on the user record for `plain`, expiring `ttl` from `now`.
    pub fn ticket_for(&self, plain: &str, now: OffsetDateTime) -> ResetTicket {
        ResetTicket {
            token_hash: Self::hash(plain),
            expires_at: now + self.ttl,
        }
    }
}

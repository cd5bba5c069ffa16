use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // absent for external-only accounts
    pub external_id: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn reset_ticket(&self) -> Option<ResetTicket> {
        match (&self.reset_token_hash, self.reset_token_expires_at) {
            (Some(token_hash), Some(expires_at)) => Some(ResetTicket {
                token_hash: token_hash.clone(),
                expires_at,
            }),
            _ => None,
        }
    }
}

/// Hashed reset token and its expiry; stored and cleared as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTicket {
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

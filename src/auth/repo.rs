use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileChanges, ResetTicket, User};
use crate::db::StoreError;

/// Persistence for user records. Email uniqueness and reset-token
/// consumption are enforced here, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `DuplicateEmail` when the email is taken, even under races.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError>;

    /// Links only when the record has no external id yet.
    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn set_reset_ticket(&self, id: Uuid, ticket: &ResetTicket) -> Result<bool, StoreError>;

    /// Atomically matches a live ticket, swaps in the new password hash and
    /// clears the ticket. At most one caller wins for a given ticket.
    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, external_id,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, external_id,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email, password_hash, external_id,
                   reset_token_hash, reset_token_expires_at, created_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, external_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, first_name, last_name, email, password_hash, external_id,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.external_id)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::classify)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET first_name    = COALESCE($2, first_name),
                   last_name     = COALESCE($3, last_name),
                   email         = COALESCE($4, email),
                   password_hash = COALESCE($5, password_hash)
             WHERE id = $1
            RETURNING id, first_name, last_name, email, password_hash, external_id,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::classify)
    }

    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET external_id = $2
             WHERE id = $1 AND external_id IS NULL
            RETURNING id, first_name, last_name, email, password_hash, external_id,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(external_id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::classify)
    }

    async fn set_reset_ticket(&self, id: Uuid, ticket: &ResetTicket) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_token_hash = $2, reset_token_expires_at = $3
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&ticket.token_hash)
        .bind(ticket.expires_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET password_hash = $3,
                   reset_token_hash = NULL,
                   reset_token_expires_at = NULL
             WHERE reset_token_hash = $1 AND reset_token_expires_at > $2
            RETURNING id, first_name, last_name, email, password_hash, external_id,
                      reset_token_hash, reset_token_expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .bind(new_password_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}

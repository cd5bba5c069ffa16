//! Process-local user store, used when no database is configured and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, ProfileChanges, ResetTicket, User};
use crate::db::StoreError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        // Check and insert under one write lock, mirroring a unique index.
        let mut users = self.users.write().await;
        if email_taken(&users, &user.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(ext) = user.external_id.as_deref() {
            if users.values().any(|u| u.external_id.as_deref() == Some(ext)) {
                return Err(StoreError::DuplicateExternalId);
            }
        }
        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            external_id: user.external_id,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = changes.email.as_deref() {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.first_name {
            user.first_name = v;
        }
        if let Some(v) = changes.last_name {
            user.last_name = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = Some(v);
        }
        Ok(Some(user.clone()))
    }

    async fn link_external_id(
        &self,
        id: Uuid,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.external_id.as_deref() == Some(external_id))
        {
            return Err(StoreError::DuplicateExternalId);
        }
        match users.get_mut(&id) {
            Some(user) if user.external_id.is_none() => {
                user.external_id = Some(external_id.to_string());
                Ok(Some(user.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_reset_ticket(&self, id: Uuid, ticket: &ResetTicket) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(false);
        };
        user.reset_token_hash = Some(ticket.token_hash.clone());
        user.reset_token_expires_at = Some(ticket.expires_at);
        Ok(true)
    }

    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
        new_password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        let hit = users.values_mut().find(|u| {
            u.reset_ticket()
                .is_some_and(|t| t.token_hash == token_hash && t.expires_at > now)
        });
        let Some(user) = hit else {
            return Ok(None);
        };
        user.password_hash = Some(new_password_hash.to_string());
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

use std::fmt;
use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    claims::IdentityClaim,
    identity::IdentityVerifier,
    jwt::JwtKeys,
    password::Hasher,
    repo::UserStore,
    repo_types::{NewUser, ProfileChanges, User},
    reset::ResetTokens,
};
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const REDACTED: &str = "[REDACTED]";

/// Registration input that has already passed validation.
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Profile edits that have already passed validation. The password is plaintext.
#[derive(Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// A user together with a freshly signed bearer token.
pub struct Session {
    pub user: User,
    pub token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user.id)
            .field("token", &REDACTED)
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    identity: Arc<dyn IdentityVerifier>,
    jwt: JwtKeys,
    hasher: Hasher,
    resets: ResetTokens,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
            identity: state.identity.clone(),
            jwt: state.jwt.clone(),
            hasher: state.hasher.clone(),
            resets: state.resets,
        }
    }
}

impl AuthService {
    fn session(&self, user: User) -> AppResult<Session> {
        let token = self.jwt.sign(user.id)?;
        Ok(Session { user, token })
    }

    pub async fn register(&self, reg: Registration) -> AppResult<Session> {
        if self.users.find_by_email(&reg.email).await?.is_some() {
            warn!(email = %reg.email, "email already registered");
            return Err(AppError::UserExists);
        }

        let password_hash = self.hasher.hash_blocking(reg.password).await?;

        // The unique index decides concurrent registrations for one email.
        let user = self
            .users
            .insert(NewUser {
                first_name: reg.first_name,
                last_name: reg.last_name,
                email: reg.email,
                password_hash: Some(password_hash),
                external_id: None,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.session(user)
    }

    pub async fn login(&self, email: &str, password: String) -> AppResult<Session> {
        let Some(user) = self.users.find_by_email(email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };
        let Some(hash) = user.password_hash.clone() else {
            warn!(user_id = %user.id, "login on account without password");
            return Err(AppError::InvalidCredentials);
        };
        if !self.hasher.verify_blocking(password, hash).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.session(user)
    }

    /// Stores a fresh reset ticket and returns the plaintext token.
    pub async fn forgot_password(&self, email: &str) -> AppResult<String> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let plain = self.resets.generate();
        let ticket = self.resets.ticket_for(&plain, OffsetDateTime::now_utc());
        if !self.users.set_reset_ticket(user.id, &ticket).await? {
            return Err(AppError::UserNotFound);
        }

        info!(user_id = %user.id, expires_at = %ticket.expires_at, "reset token issued");
        Ok(plain)
    }

    pub async fn reset_password(&self, token: &str, new_password: String) -> AppResult<User> {
        let token_hash = ResetTokens::hash(token);
        let new_hash = self.hasher.hash_blocking(new_password).await?;
        let user = self
            .users
            .consume_reset_ticket(&token_hash, OffsetDateTime::now_utc(), &new_hash)
            .await?
            .ok_or(AppError::InvalidOrExpiredToken)?;

        info!(user_id = %user.id, "password reset");
        Ok(user)
    }

    pub async fn external_sign_in(&self, token: &str) -> AppResult<Session> {
        let claim = self.identity.verify(token).await?;
        let subject = claim.subject.clone();

        if let Some(user) = self.users.find_by_external_id(&subject).await? {
            info!(user_id = %user.id, "external sign-in");
            return self.session(user);
        }

        let user = match self.users.find_by_email(&claim.email).await? {
            Some(existing) if existing.external_id.is_none() => {
                match self.users.link_external_id(existing.id, &subject).await {
                    Ok(Some(linked)) => {
                        info!(user_id = %linked.id, "external identity linked to existing account");
                        linked
                    }
                    Ok(None) | Err(StoreError::DuplicateExternalId) => {
                        return self.settle_external(&subject).await;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Some(existing) if existing.external_id.as_deref() == Some(subject.as_str()) => {
                info!(user_id = %existing.id, "external sign-in");
                existing
            }
            Some(existing) => {
                warn!(user_id = %existing.id, "email bound to a different external identity");
                return Err(AppError::Unauthorized);
            }
            None => match self.users.insert(new_external_user(claim)).await {
                Ok(user) => {
                    info!(user_id = %user.id, "user created from external identity");
                    user
                }
                Err(StoreError::DuplicateEmail | StoreError::DuplicateExternalId) => {
                    return self.settle_external(&subject).await;
                }
                Err(e) => return Err(e.into()),
            },
        };

        self.session(user)
    }

    /// A concurrent sign-in created or linked the record first; use whatever won.
    async fn settle_external(&self, subject: &str) -> AppResult<Session> {
        match self.users.find_by_external_id(subject).await? {
            Some(user) => {
                info!(user_id = %user.id, "external sign-in after concurrent create");
                self.session(user)
            }
            None => {
                warn!(subject = %subject, "email bound to a different external identity");
                Err(AppError::Unauthorized)
            }
        }
    }

    pub async fn update_profile(&self, user_id: uuid::Uuid, update: ProfileUpdate) -> AppResult<User> {
        let password_hash = match update.password {
            Some(plain) => Some(self.hasher.hash_blocking(plain).await?),
            None => None,
        };
        let changes = ProfileChanges {
            first_name: update.first_name,
            last_name: update.last_name,
            email: update.email,
            password_hash,
        };
        let user = self
            .users
            .update_profile(user_id, changes)
            .await?
            .ok_or(AppError::UserNotFound)?;

        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }
}

fn new_external_user(claim: IdentityClaim) -> NewUser {
    let fallback = claim
        .email
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();
    let name_or_fallback = |name: Option<String>| {
        name.filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback.clone())
    };
    NewUser {
        first_name: name_or_fallback(claim.given_name),
        last_name: name_or_fallback(claim.family_name),
        email: claim.email,
        password_hash: None,
        external_id: Some(claim.subject),
    }
}

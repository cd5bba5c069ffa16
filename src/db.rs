use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::error::AppError;

pub const EMAIL_UNIQUE: &str = "users_email_key";
pub const EXTERNAL_ID_UNIQUE: &str = "users_external_id_key";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("external identity already linked")]
    DuplicateExternalId,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps unique-constraint violations onto domain conflicts.
    pub fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some(EMAIL_UNIQUE) => return StoreError::DuplicateEmail,
                    Some(EXTERNAL_ID_UNIQUE) => return StoreError::DuplicateExternalId,
                    _ => {}
                }
            }
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AppError::UserExists,
            StoreError::DuplicateExternalId => AppError::Unauthorized,
            StoreError::Database(e) => AppError::Internal(anyhow::Error::new(e).context("store")),
        }
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    Ok(db)
}

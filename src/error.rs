//! Central error type and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::messages;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input rejected before any core logic.
    #[error("{0}")]
    Validation(String),

    #[error("{}", messages::USER_EXISTS)]
    UserExists,

    #[error("{}", messages::USER_NOT_FOUND)]
    UserNotFound,

    /// Unknown email and wrong password share this variant.
    #[error("{}", messages::INVALID_CREDENTIALS)]
    InvalidCredentials,

    #[error("{}", messages::AUTH_REQUIRED)]
    AuthRequired,

    /// Bad, expired or orphaned bearer token, or a rejected external identity.
    #[error("{}", messages::UNAUTHORISED)]
    Unauthorized,

    #[error("{}", messages::INVALID_TOKEN)]
    InvalidOrExpiredToken,

    #[error("{}", messages::INVALID_UPDATE)]
    InvalidUpdate,

    #[error("{}", messages::TASK_NOT_FOUND)]
    TaskNotFound,

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidUpdate => StatusCode::BAD_REQUEST,
            AppError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AppError::UserExists => StatusCode::CONFLICT,
            AppError::UserNotFound | AppError::TaskNotFound => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials | AppError::AuthRequired | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            AppError::Internal(e) => tracing::error!(error = ?e, "internal error"),
            AppError::InvalidCredentials => tracing::warn!("invalid login attempt"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let body = match &self {
            AppError::Validation(msg) => json!({ "error": msg }),
            AppError::Internal(_) => json!({ "message": messages::INTERNAL_SERVER_ERROR }),
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::UserExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::UserNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AuthRequired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidOrExpiredToken.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_error_hides_details() {
        let res = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("hunter2"));
        assert!(body.contains(messages::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn validation_error_uses_error_key() {
        let res = AppError::Validation("email is invalid".into()).into_response();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "email is invalid");
    }
}

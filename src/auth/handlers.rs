use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, ExternalSignInRequest, ForgotPasswordRequest, LoginRequest,
            MessageResponse, ProfileResponse, RegisterRequest, ResetPasswordRequest,
            ResetTokenResponse, UpdateProfileRequest, PROFILE_FIELDS,
        },
        extractors::AuthUser,
        services::{AuthService, ProfileUpdate, Registration},
    },
    error::{AppError, AppResult},
    messages,
    state::AppState,
    validation,
};

/// Expires any token cookie the client may still hold.
const CLEAR_TOKEN_COOKIE: &str = "token=; Path=/; Max-Age=0; HttpOnly; SameSite=Strict";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/external", post(external_sign_in))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let mut payload = validation::body(payload)?;
    payload.email = payload.email.trim().to_string();
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();

    validation::length("firstName", &payload.first_name, validation::NAME_LEN)?;
    validation::length("lastName", &payload.last_name, validation::NAME_LEN)?;
    validation::email(&payload.email)?;
    validation::password("password", &payload.password)?;

    let session = auth
        .register(Registration {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: messages::REGISTRATION_SUCCESS,
            token: session.token,
            user: session.user.into(),
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let payload = validation::body(payload)?;
    let email = payload.email.trim();
    validation::email(email)?;
    validation::password("password", &payload.password)?;

    let session = auth.login(email, payload.password).await?;

    Ok(Json(AuthResponse {
        message: messages::LOGIN_SUCCESS,
        token: session.token,
        user: session.user.into(),
    }))
}

/// Tokens are stateless; logging out only tells the client to drop its copy.
#[instrument]
pub async fn logout() -> impl IntoResponse {
    info!("logout");
    (
        StatusCode::OK,
        [(SET_COOKIE, CLEAR_TOKEN_COOKIE)],
        Json(MessageResponse {
            message: messages::LOGOUT_SUCCESS,
        }),
    )
}

#[instrument(skip(auth, payload))]
pub async fn forgot_password(
    State(auth): State<AuthService>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> AppResult<Json<ResetTokenResponse>> {
    let payload = validation::body(payload)?;
    let email = payload.email.trim();
    validation::email(email)?;

    // Stand-in for email delivery: the token goes back in the response.
    let token = auth.forgot_password(email).await?;

    Ok(Json(ResetTokenResponse {
        message: messages::TOKEN_GENERATED,
        token,
    }))
}

#[instrument(skip(auth, payload))]
pub async fn reset_password(
    State(auth): State<AuthService>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let payload = validation::body(payload)?;
    validation::required("token", &payload.token)?;
    validation::password("newPassword", &payload.new_password)?;

    auth.reset_password(payload.token.trim(), payload.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: messages::PASSWORD_RESET_SUCCESS,
    }))
}

#[instrument(skip(auth, payload))]
pub async fn external_sign_in(
    State(auth): State<AuthService>,
    payload: Result<Json<ExternalSignInRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let payload = validation::body(payload)?;
    validation::required("token", &payload.token)?;

    let session = auth.external_sign_in(payload.token.trim()).await?;

    Ok(Json(AuthResponse {
        message: messages::LOGIN_SUCCESS,
        token: session.token,
        user: session.user.into(),
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: messages::DATA_FETCHED,
        data: user.into(),
    })
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_profile(
    State(auth): State<AuthService>,
    AuthUser(user): AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<ProfileResponse>> {
    let raw = validation::body(payload)?;
    let Value::Object(fields) = &raw else {
        return Err(AppError::InvalidUpdate);
    };
    if fields.keys().any(|k| !PROFILE_FIELDS.contains(&k.as_str())) {
        return Err(AppError::InvalidUpdate);
    }
    let req: UpdateProfileRequest =
        serde_json::from_value(raw).map_err(|e| AppError::Validation(e.to_string()))?;

    let first_name = req.first_name.map(|v| v.trim().to_string());
    let last_name = req.last_name.map(|v| v.trim().to_string());
    let email = req.email.map(|v| v.trim().to_string());
    if let Some(v) = &first_name {
        validation::length("firstName", v, validation::NAME_LEN)?;
    }
    if let Some(v) = &last_name {
        validation::length("lastName", v, validation::NAME_LEN)?;
    }
    if let Some(v) = &email {
        validation::email(v)?;
    }
    if let Some(v) = &req.password {
        validation::password("password", v)?;
    }

    let updated = auth
        .update_profile(
            user.id,
            ProfileUpdate {
                first_name,
                last_name,
                email,
                password: req.password,
            },
        )
        .await?;

    Ok(Json(ProfileResponse {
        message: messages::DATA_UPDATED,
        data: updated.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::PublicUser;

    #[test]
    fn public_user_serializes_camel_case() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "test@example.com".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(json.contains("firstName"));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let res = logout().await.into_response();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}

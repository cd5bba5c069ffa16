mod common;

use std::{sync::Arc, time::Duration};

use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use time::OffsetDateTime;
use tower::ServiceExt;

use common::{post, register, registration, send, state_with, test_app};
use tasknest::{
    app::build_app,
    auth::{identity::DisabledVerifier, repo::UserStore},
};

#[tokio::test]
async fn register_returns_created_with_token() {
    let (app, _) = test_app();
    let (status, body) = post(&app, "/api/v1/auth/register", registration("ada@example.com")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;
    let (status, body) = post(&app, "/api/v1/auth/register", registration("ada@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn concurrent_registrations_yield_one_winner() {
    let (app, _) = test_app();
    let (a, b) = tokio::join!(
        post(&app, "/api/v1/auth/register", registration("race@example.com")),
        post(&app, "/api/v1/auth/register", registration("race@example.com")),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn register_validates_input() {
    let (app, _) = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/auth/register",
        json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "nope", "password": "analytical" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, _) = post(
        &app,
        "/api/v1/auth/register",
        json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com", "password": "123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, "/api/v1/auth/register", json!({ "email": "ada@example.com" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_succeeds_with_correct_password() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;
    let (status, body) = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "analytical" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User logged in successfully");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn login_failures_share_one_shape() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;

    let wrong_password = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "not-it-at-all" }),
    )
    .await;
    let unknown_email = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ghost@example.com", "password": "analytical" }),
    )
    .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1, json!({ "message": "Invalid credentials" }));
}

#[tokio::test]
async fn logout_needs_no_input_and_clears_cookie() {
    let (app, _) = test_app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/logout")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn reset_token_round_trip_is_single_use() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;

    let (status, body) = post(
        &app,
        "/api/v1/auth/forgot-password",
        json!({ "email": "ada@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reset = body["token"].as_str().unwrap().to_string();

    let reset_body = json!({ "token": reset, "newPassword": "babbage-engine" });
    let (status, body) = post(&app, "/api/v1/auth/reset-password", reset_body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password reset successfully");

    let (status, body) = post(&app, "/api/v1/auth/reset-password", reset_body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired reset token");

    let (status, _) = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "babbage-engine" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "analytical" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn newer_reset_token_replaces_older_one() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;
    let forgot = json!({ "email": "ada@example.com" });
    let (_, first) = post(&app, "/api/v1/auth/forgot-password", forgot.clone()).await;
    let (_, second) = post(&app, "/api/v1/auth/forgot-password", forgot).await;

    let (status, _) = post(
        &app,
        "/api/v1/auth/reset-password",
        json!({ "token": first["token"], "newPassword": "whatever1" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/v1/auth/reset-password",
        json!({ "token": second["token"], "newPassword": "whatever1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn concurrent_resets_with_one_token_yield_one_winner() {
    let (app, _) = test_app();
    register(&app, "ada@example.com").await;
    let (_, body) = post(
        &app,
        "/api/v1/auth/forgot-password",
        json!({ "email": "ada@example.com" }),
    )
    .await;
    let token = body["token"].clone();

    let (a, b) = tokio::join!(
        post(
            &app,
            "/api/v1/auth/reset-password",
            json!({ "token": token, "newPassword": "first-choice" }),
        ),
        post(
            &app,
            "/api/v1/auth/reset-password",
            json!({ "token": token, "newPassword": "second-choice" }),
        ),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let winner = if a.0 == StatusCode::OK { "first-choice" } else { "second-choice" };
    let (status, _) = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": winner }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forgot_password_unknown_email_is_not_found() {
    let (app, _) = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/auth/forgot-password",
        json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn profile_requires_bearer_token() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required!");
}

#[tokio::test]
async fn profile_rejects_spliced_token() {
    let (app, _) = test_app();
    let ada = register(&app, "ada@example.com").await;
    let bob = register(&app, "bob@example.com").await;

    let ada_parts: Vec<&str> = ada.split('.').collect();
    let bob_parts: Vec<&str> = bob.split('.').collect();
    let forged = format!("{}.{}.{}", ada_parts[0], bob_parts[1], ada_parts[2]);

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorised!");
}

#[tokio::test]
async fn profile_rejects_expired_token() {
    let (app, state) = test_app();
    register(&app, "ada@example.com").await;
    let user = state.users.find_by_email("ada@example.com").await.unwrap().unwrap();
    let issued = OffsetDateTime::now_utc() - time::Duration::hours(2);
    let expired = state
        .jwt
        .issue_at(user.id, Duration::from_secs(3600), issued)
        .unwrap();

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorised!");
}

#[tokio::test]
async fn profile_rejects_token_of_deleted_user() {
    let (app, state) = test_app();
    let token = register(&app, "ada@example.com").await;
    let user = state.users.find_by_email("ada@example.com").await.unwrap().unwrap();
    assert!(state.users.delete(user.id).await.unwrap());

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorised!");
}

#[tokio::test]
async fn profile_get_and_update() {
    let (app, _) = test_app();
    let token = register(&app, "ada@example.com").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstName"], "Ada");

    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/profile",
        Some(&token),
        Some(json!({ "lastName": "Byron", "password": "new-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data updated successfully");
    assert_eq!(body["data"]["lastName"], "Byron");

    let (status, _) = post(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ada@example.com", "password": "new-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_refuses_fields_outside_allow_list() {
    let (app, _) = test_app();
    let token = register(&app, "ada@example.com").await;
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/profile",
        Some(&token),
        Some(json!({ "firstName": "Augusta", "resetTokenHash": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid updates!");

    let (_, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&token), None).await;
    assert_eq!(body["data"]["firstName"], "Ada");
}

#[tokio::test]
async fn profile_email_change_cannot_collide() {
    let (app, _) = test_app();
    register(&app, "taken@example.com").await;
    let token = register(&app, "ada@example.com").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/auth/profile",
        Some(&token),
        Some(json!({ "email": "taken@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn external_sign_in_issues_usable_token() {
    let (app, _) = test_app();
    let (status, body) = post(
        &app,
        "/api/v1/auth/external",
        json!({ "token": "subject-1:grace@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/v1/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert_eq!(body["data"]["lastName"], "Hopper");
}

#[tokio::test]
async fn external_sign_in_rejects_bad_identity_token() {
    let (app, _) = test_app();
    let (status, _) = post(&app, "/api/v1/auth/external", json!({ "token": "garbage" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn external_sign_in_without_provider_is_internal_error() {
    let app = build_app(state_with(Arc::new(DisabledVerifier)));
    let (status, body) = post(&app, "/api/v1/auth/external", json!({ "token": "a:b@example.com" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Internal server error");
}

#[tokio::test]
async fn health_check() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}

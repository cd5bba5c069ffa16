#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use tasknest::{
    app::build_app,
    auth::{
        identity::{IdentityError, IdentityVerifier},
        IdentityClaim,
    },
    config::{AppConfig, HashConfig, JwtConfig},
    state::AppState,
};

/// Accepts tokens of the form `<subject>:<email>`.
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError> {
        let (subject, email) = token
            .split_once(':')
            .ok_or_else(|| IdentityError::Rejected("malformed".into()))?;
        Ok(IdentityClaim {
            subject: subject.into(),
            email: email.into(),
            given_name: Some("Grace".into()),
            family_name: Some("Hopper".into()),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: None,
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            issuer: "tasknest".into(),
            audience: "tasknest-users".into(),
            ttl_minutes: 60,
        },
        hashing: HashConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        reset_ttl_minutes: 60,
        identity: None,
    }
}

pub fn state_with(identity: Arc<dyn IdentityVerifier>) -> AppState {
    AppState::in_memory(Arc::new(test_config()), identity).expect("state")
}

pub fn test_app() -> (Router, AppState) {
    let state = state_with(Arc::new(FakeVerifier));
    (build_app(state.clone()), state)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub fn registration(email: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "password": "analytical"
    })
}

/// Registers a user and returns their bearer token.
pub async fn register(app: &Router, email: &str) -> String {
    let (status, body) = post(app, "/api/v1/auth/register", registration(email)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().expect("token").to_string()
}

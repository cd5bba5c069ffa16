//! Verification of identity tokens issued by an external provider.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::claims::IdentityClaim;
use crate::config::IdentityConfig;
use crate::error::AppError;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity token rejected: {0}")]
    Rejected(String),
    #[error("external sign-in is not configured")]
    Unavailable,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(_) => AppError::Unauthorized,
            IdentityError::Unavailable => AppError::Internal(err.into()),
        }
    }
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError>;
}

#[derive(Debug, Deserialize)]
struct ProviderClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    given_name: Option<String>,
    family_name: Option<String>,
}

/// Checks signature, issuer, audience and expiry of a provider-issued JWT.
pub struct JwtIdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(key: DecodingKey, algorithm: Algorithm, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Self { key, validation }
    }

    pub fn from_config(cfg: &IdentityConfig) -> anyhow::Result<Self> {
        let key = DecodingKey::from_rsa_pem(cfg.public_key_pem.as_bytes())?;
        Ok(Self::new(key, Algorithm::RS256, &cfg.issuer, &cfg.audience))
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaim, IdentityError> {
        let data = decode::<ProviderClaims>(token, &self.key, &self.validation).map_err(|e| {
            warn!(error = %e, "external identity token rejected");
            IdentityError::Rejected(e.to_string())
        })?;
        let claims = data.claims;
        if claims.email_verified == Some(false) {
            return Err(IdentityError::Rejected("email not verified".into()));
        }
        let email = claims
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IdentityError::Rejected("missing email claim".into()))?;
        debug!(subject = %claims.sub, "external identity verified");
        Ok(IdentityClaim {
            subject: claims.sub,
            email,
            given_name: claims.given_name,
            family_name: claims.family_name,
        })
    }
}

/// Stand-in when no provider is configured; every call fails as unavailable.
pub struct DisabledVerifier;

#[async_trait]
impl IdentityVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<IdentityClaim, IdentityError> {
        Err(IdentityError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use time::OffsetDateTime;

    use super::*;

    const SECRET: &[u8] = b"provider-secret";

    fn verifier() -> JwtIdentityVerifier {
        JwtIdentityVerifier::new(
            DecodingKey::from_secret(SECRET),
            Algorithm::HS256,
            "https://id.example.com",
            "tasknest",
        )
    }

    fn provider_token(extra: serde_json::Value) -> String {
        let exp = OffsetDateTime::now_utc().unix_timestamp() + 600;
        let mut claims = json!({
            "sub": "provider-123",
            "iss": "https://id.example.com",
            "aud": "tasknest",
            "exp": exp,
            "email": "ada@example.com",
            "given_name": "Ada",
            "family_name": "Lovelace",
        });
        if let (Some(base), Some(more)) = (claims.as_object_mut(), extra.as_object()) {
            for (k, v) in more {
                base.insert(k.clone(), v.clone());
            }
        }
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_provider_token() {
        let claim = verifier().verify(&provider_token(json!({}))).await.unwrap();
        assert_eq!(claim.subject, "provider-123");
        assert_eq!(claim.email, "ada@example.com");
        assert_eq!(claim.given_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let token = provider_token(json!({ "aud": "someone-else" }));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(IdentityError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn rejects_unverified_email() {
        let token = provider_token(json!({ "email_verified": false }));
        assert!(matches!(
            verifier().verify(&token).await,
            Err(IdentityError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn disabled_verifier_is_unavailable() {
        let err = DisabledVerifier.verify("anything").await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }
}

//! Verified identity for incoming requests
//!
//! Token issuance lives elsewhere; this side only checks bearer tokens and
//! turns them into a [`UserId`] before any cart logic runs.

use axum::{async_trait, extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use super::{ApiError, AppState};
use crate::domain::value_objects::UserId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub is_admin: bool,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token verification is not configured")]
    NotConfigured,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token carries no user id")]
    MissingSubject,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: Option<String>,
    sub: Option<String>,
    #[serde(default)]
    is_admin: bool,
}

/// HS256 JWT verification with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation: Validation::new(Algorithm::HS256) }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| AuthError::Invalid(e.to_string()))?;
        let claims = data.claims;
        let raw = claims.user_id.or(claims.sub).ok_or(AuthError::MissingSubject)?;
        let user_id = UserId::new(raw).map_err(|_| AuthError::MissingSubject)?;
        Ok(Identity { user_id, is_admin: claims.is_admin })
    }
}

/// Refuses every token; used when no secret is configured.
pub struct DenyAll;

impl IdentityVerifier for DenyAll {
    fn verify(&self, _token: &str) -> Result<Identity, AuthError> { Err(AuthError::NotConfigured) }
}

/// Extractor for the caller's verified identity. Rejects with 401.
pub struct VerifiedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Access token required"))?;
        state.verifier.verify(token).map(VerifiedUser).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::unauthorized("Invalid or expired token")
        })
    }
}

/// Extractor for a verified identity carrying the admin flag. Rejects with 401 or 403.
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let VerifiedUser(identity) = VerifiedUser::from_request_parts(parts, state).await?;
        if !identity.is_admin {
            tracing::warn!(user_id = %identity.user_id, "non-admin asked for all carts");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn exp() -> i64 { chrono::Utc::now().timestamp() + 3600 }

    #[test]
    fn test_accepts_user_id_claim() {
        let v = JwtVerifier::new("s3cret");
        let id = v.verify(&token(json!({"userId": "u1", "exp": exp()}), "s3cret")).unwrap();
        assert_eq!(id.user_id.as_str(), "u1");
        assert!(!id.is_admin);
    }

    #[test]
    fn test_falls_back_to_sub_and_reads_admin() {
        let v = JwtVerifier::new("s3cret");
        let id = v.verify(&token(json!({"sub": "ops", "isAdmin": true, "exp": exp()}), "s3cret")).unwrap();
        assert_eq!(id.user_id.as_str(), "ops");
        assert!(id.is_admin);
    }

    #[test]
    fn test_rejects_bad_tokens() {
        let v = JwtVerifier::new("s3cret");
        assert!(matches!(v.verify(&token(json!({"userId": "u1", "exp": exp()}), "other")), Err(AuthError::Invalid(_))));
        assert!(matches!(v.verify(&token(json!({"userId": "u1", "exp": 1000}), "s3cret")), Err(AuthError::Invalid(_))));
        assert!(matches!(v.verify(&token(json!({"exp": exp()}), "s3cret")), Err(AuthError::MissingSubject)));
        assert!(matches!(v.verify("garbage"), Err(AuthError::Invalid(_))));
        assert!(matches!(DenyAll.verify("anything"), Err(AuthError::NotConfigured)));
    }
}

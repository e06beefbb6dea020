//! Bearer-token verification for service endpoints.
//!
//! The auth side of the platform issues HS256 access tokens; services only
//! ever verify them. Claims mirror what the identity provider puts in its
//! access tokens.

use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    #[serde(default)]
    pub jti: Option<String>,
}

/// Verifies caller access tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(secret: &Secret<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        }
    }

    /// Validate a raw token and return its claims.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Extract and validate the bearer token from request headers.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<AccessTokenClaims, AppError> {
        let token = extract_bearer_token(headers)?;
        self.verify(token)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing Authorization header")))?;

    let value = value.to_str().map_err(|_| {
        AppError::AuthError(anyhow::anyhow!("Invalid Authorization header encoding"))
    })?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| {
            AppError::AuthError(anyhow::anyhow!(
                "Authorization header must use the Bearer scheme"
            ))
        })?
        .trim();

    if token.is_empty() {
        return Err(AppError::AuthError(anyhow::anyhow!("Empty bearer token")));
    }

    Ok(token)
}

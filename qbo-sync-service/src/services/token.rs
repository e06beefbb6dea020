//! OAuth token refresh against the Intuit token endpoint.
//!
//! Refresh is never retried: Intuit rotates refresh tokens on use, so a
//! blind second attempt can burn a token that already rotated server-side.

use chrono::{Duration, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::config::QboConfig;
use crate::store::TokenStore;

#[derive(Debug, Error)]
pub enum TokenRefreshError {
    #[error("token refresh request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {detail}")]
    Rejected { status: u16, detail: String },

    #[error("token response missing access_token")]
    MalformedResponse,

    #[error("failed to persist refreshed tokens: {0}")]
    Store(#[from] AppError),
}

/// Exchanges a refresh token for a fresh access token and persists the
/// rotated pair.
#[derive(Clone)]
pub struct TokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
}

impl TokenRefresher {
    pub fn new(config: &QboConfig) -> Self {
        Self {
            client: Client::new(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Refresh the access token for a company and store the result.
    /// Returns the new access token for immediate use in the same run.
    pub async fn refresh<S: TokenStore + ?Sized>(
        &self,
        store: &S,
        company_id: Uuid,
        refresh_token: &str,
    ) -> Result<String, TokenRefreshError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v["error_description"]
                        .as_str()
                        .or_else(|| v["error"].as_str())
                        .map(|s| s.to_string())
                })
                .unwrap_or_else(|| body.clone());

            tracing::error!(
                company_id = %company_id,
                status = %status,
                detail = %detail,
                "QuickBooks token refresh rejected"
            );

            return Err(TokenRefreshError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|_| TokenRefreshError::MalformedResponse)?;

        let access_token = payload["access_token"]
            .as_str()
            .ok_or(TokenRefreshError::MalformedResponse)?
            .to_string();

        // Intuit usually rotates the refresh token; keep the old one when the
        // response omits it.
        let new_refresh_token = payload["refresh_token"]
            .as_str()
            .unwrap_or(refresh_token)
            .to_string();

        let expires_in = payload["expires_in"].as_i64().unwrap_or(3600);
        let expires_at = Utc::now() + Duration::seconds(expires_in);

        store
            .update_tokens(company_id, &access_token, &new_refresh_token, expires_at)
            .await?;

        tracing::info!(
            company_id = %company_id,
            expires_at = %expires_at,
            "QuickBooks access token refreshed"
        );

        Ok(access_token)
    }
}

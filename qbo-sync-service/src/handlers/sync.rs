//! The sync endpoint.

use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service_core::auth::AccessTokenClaims;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::services::metrics::{record_error, SYNC_RUNS};
use crate::startup::AppState;
use crate::sync::{run_company_sync, SyncedEntity};

/// Authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub AccessTokenClaims);

#[async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.jwt.verify_headers(&parts.headers)?;
        Ok(Self(claims))
    }
}

/// Request body for `POST /sync`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[validate(length(min = 1, message = "companyId is required"))]
    pub company_id: String,
}

/// Success payload for `POST /sync`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub items_count: usize,
    pub accounts_count: usize,
    pub pl_data_count: usize,
    pub message: String,
    pub items_found: Vec<SyncedEntity>,
    pub accounts_found: Vec<SyncedEntity>,
}

/// Run a full QuickBooks sync for the company in the request body.
pub async fn sync_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(payload): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    payload.validate()?;

    let company_id = Uuid::parse_str(payload.company_id.trim())
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("companyId must be a valid UUID")))?;

    tracing::info!(
        company_id = %company_id,
        caller = %caller.0.sub,
        "Starting QuickBooks sync"
    );

    match run_company_sync(
        &state.store,
        &state.config.qbo,
        &state.refresher,
        company_id,
        Utc::now(),
    )
    .await
    {
        Ok(summary) => {
            SYNC_RUNS.with_label_values(&["success"]).inc();

            let message = format!(
                "Synced {} items, {} accounts and {} P&L rows from QuickBooks",
                summary.items_count, summary.accounts_count, summary.pl_data_count
            );

            Ok(Json(SyncResponse {
                success: true,
                items_count: summary.items_count,
                accounts_count: summary.accounts_count,
                pl_data_count: summary.pl_data_count,
                message,
                items_found: summary.items_found,
                accounts_found: summary.accounts_found,
            }))
        }
        Err(e) => {
            SYNC_RUNS.with_label_values(&["failure"]).inc();
            record_error("sync_run");
            tracing::error!(company_id = %company_id, error = %e, "QuickBooks sync failed");
            Err(e.into())
        }
    }
}

//! Sync orchestration: token handling plus the three reconcilers, run
//! sequentially. Accounts must land before P&L reconciliation because the
//! P&L walk resolves account types against the chart of accounts.

pub mod accounts;
pub mod items;
pub mod profit_loss;

use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::config::QboConfig;
use crate::services::metrics::{record_error, SYNC_PHASE_DURATION};
use crate::services::{QboApiError, QboClient, TokenRefreshError, TokenRefresher};
use crate::store::SyncStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No active QuickBooks connection found for this company. Please reconnect QuickBooks to continue syncing.")]
    ConnectionNotFound,

    #[error("QuickBooks token refresh failed: {0}. Please reconnect QuickBooks.")]
    TokenRefresh(#[source] TokenRefreshError),

    #[error("QuickBooks API error: {0}")]
    RemoteApi(#[from] QboApiError),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(inner) => inner,
            other => AppError::BadRequest(anyhow::anyhow!("{}", other)),
        }
    }
}

/// Name and external id of a reconciled record, for the response diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedEntity {
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// Result of a full sync run.
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub items_count: usize,
    pub accounts_count: usize,
    pub pl_data_count: usize,
    pub items_found: Vec<SyncedEntity>,
    pub accounts_found: Vec<SyncedEntity>,
}

/// Run a full sync for one company.
///
/// Authentication and token failures abort the run. A failure inside the
/// item or account reconciler is logged and reported as a zero count;
/// whatever earlier steps upserted stays durable, and rerunning the sync is
/// always safe.
#[instrument(skip(store, qbo_config, refresher), fields(company_id = %company_id))]
pub async fn run_company_sync<S: SyncStore>(
    store: &S,
    qbo_config: &QboConfig,
    refresher: &TokenRefresher,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<SyncSummary, SyncError> {
    let tokens = store
        .get_tokens(company_id)
        .await?
        .ok_or(SyncError::ConnectionNotFound)?;

    let status = store
        .get_connection_status(company_id)
        .await?
        .ok_or(SyncError::ConnectionNotFound)?;
    if !status.is_active {
        return Err(SyncError::ConnectionNotFound);
    }

    // An exactly-expiring token counts as expired.
    let access_token = if tokens.token_expires_at <= now {
        tracing::info!(
            expires_at = %tokens.token_expires_at,
            "Access token expired; refreshing"
        );
        refresher
            .refresh(store, company_id, &tokens.refresh_token)
            .await
            .map_err(SyncError::TokenRefresh)?
    } else {
        tokens.access_token.clone()
    };

    let qbo = QboClient::new(&qbo_config.api_base_url, &tokens.qbo_realm_id, &access_token);

    let timer = SYNC_PHASE_DURATION.with_label_values(&["items"]).start_timer();
    let (items_count, items_found) = match items::sync_items(&qbo, store, company_id).await {
        Ok(result) => result,
        Err(e) => {
            record_error("items_sync");
            tracing::warn!(error = %e, "Item sync failed; continuing with remaining steps");
            (0, Vec::new())
        }
    };
    timer.observe_duration();

    let timer = SYNC_PHASE_DURATION
        .with_label_values(&["accounts"])
        .start_timer();
    let (accounts_count, accounts_found) =
        match accounts::sync_accounts(&qbo, store, company_id).await {
            Ok(result) => result,
            Err(e) => {
                record_error("accounts_sync");
                tracing::warn!(error = %e, "Account sync failed; continuing with remaining steps");
                (0, Vec::new())
            }
        };
    timer.observe_duration();

    let timer = SYNC_PHASE_DURATION
        .with_label_values(&["profit_loss"])
        .start_timer();
    let pl_data_count = profit_loss::sync_profit_loss(&qbo, store, company_id, now).await?;
    timer.observe_duration();

    store.update_last_sync(company_id).await?;

    tracing::info!(
        items = items_count,
        accounts = accounts_count,
        pl_rows = pl_data_count,
        "Sync completed"
    );

    Ok(SyncSummary {
        items_count,
        accounts_count,
        pl_data_count,
        items_found,
        accounts_found,
    })
}

//! Stored QuickBooks connection state.
//!
//! Token material is only ever read through the token-store operations; the
//! non-sensitive projection is what handlers and diagnostics see.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// OAuth token material for a connected company.
#[derive(Debug, Clone, FromRow)]
pub struct QboTokens {
    pub company_id: Uuid,
    pub qbo_realm_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
}

/// Non-sensitive connection fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QboConnectionStatus {
    pub id: Uuid,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

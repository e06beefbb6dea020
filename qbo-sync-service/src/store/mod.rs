//! Storage seams for the sync pipeline.
//!
//! Each entity gets its own repository trait so the reconcilers stay
//! storage-agnostic; `PgStore` is the production implementation and
//! `MemoryStore` backs the tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    AccountUpsert, LedgerAccount, ProductUpsert, ProfitLossEntry, QboConnectionStatus, QboTokens,
};

/// OAuth token material and connection bookkeeping for a company.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_tokens(&self, company_id: Uuid) -> Result<Option<QboTokens>, AppError>;

    async fn get_connection_status(
        &self,
        company_id: Uuid,
    ) -> Result<Option<QboConnectionStatus>, AppError>;

    async fn update_tokens(
        &self,
        company_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn update_last_sync(&self, company_id: Uuid) -> Result<(), AppError>;
}

/// Product catalog upserts keyed on (company_id, qbo_id).
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn upsert_product(&self, product: &ProductUpsert) -> Result<(), AppError>;
}

/// Chart-of-accounts upserts and lookups.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn upsert_account(&self, account: &AccountUpsert) -> Result<(), AppError>;

    /// Find an account by its QBO id, falling back to a case-insensitive
    /// name match.
    async fn find_account(
        &self,
        company_id: Uuid,
        qbo_id: Option<&str>,
        name: &str,
    ) -> Result<Option<LedgerAccount>, AppError>;

    /// Active revenue/expense accounts, the population relevant to P&L.
    async fn list_pl_accounts(&self, company_id: Uuid) -> Result<Vec<LedgerAccount>, AppError>;
}

/// Full-replace persistence for P&L entries.
#[async_trait]
pub trait ProfitLossStore: Send + Sync {
    /// Delete every entry for (company_id, fiscal_year) and insert the given
    /// set in the same transaction.
    async fn replace_for_year(
        &self,
        company_id: Uuid,
        fiscal_year: i32,
        entries: &[ProfitLossEntry],
    ) -> Result<(), AppError>;
}

/// Everything the sync orchestrator needs from storage.
pub trait SyncStore: TokenStore + ProductStore + AccountStore + ProfitLossStore {}

impl<T: TokenStore + ProductStore + AccountStore + ProfitLossStore> SyncStore for T {}

//! In-memory store implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    AccountUpsert, LedgerAccount, Product, ProductUpsert, ProfitLossEntry, QboConnectionStatus,
    QboTokens,
};

use super::{AccountStore, ProductStore, ProfitLossStore, TokenStore};

/// In-memory store for testing purposes.
pub struct MemoryStore {
    tokens: Mutex<HashMap<Uuid, QboTokens>>,
    statuses: Mutex<HashMap<Uuid, QboConnectionStatus>>,
    products: Mutex<HashMap<(Uuid, String), Product>>,
    accounts: Mutex<HashMap<(Uuid, String), LedgerAccount>>,
    profit_loss: Mutex<Vec<ProfitLossEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            products: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            profit_loss: Mutex::new(Vec::new()),
        }
    }

    /// Seed an active connection, as the connect flow would have stored it.
    pub async fn seed_connection(
        &self,
        company_id: Uuid,
        realm_id: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: DateTime<Utc>,
    ) {
        self.tokens.lock().await.insert(
            company_id,
            QboTokens {
                company_id,
                qbo_realm_id: realm_id.to_string(),
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                token_expires_at,
            },
        );
        self.statuses.lock().await.insert(
            company_id,
            QboConnectionStatus {
                id: Uuid::new_v4(),
                is_active: true,
                last_sync_at: None,
                token_expires_at,
                created_at: Utc::now(),
            },
        );
    }

    pub async fn products(&self) -> Vec<Product> {
        self.products.lock().await.values().cloned().collect()
    }

    pub async fn accounts(&self) -> Vec<LedgerAccount> {
        self.accounts.lock().await.values().cloned().collect()
    }

    pub async fn profit_loss_entries(&self) -> Vec<ProfitLossEntry> {
        self.profit_loss.lock().await.clone()
    }

    pub async fn stored_tokens(&self, company_id: Uuid) -> Option<QboTokens> {
        self.tokens.lock().await.get(&company_id).cloned()
    }

    pub async fn last_sync_at(&self, company_id: Uuid) -> Option<DateTime<Utc>> {
        self.statuses
            .lock()
            .await
            .get(&company_id)
            .and_then(|s| s.last_sync_at)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn get_tokens(&self, company_id: Uuid) -> Result<Option<QboTokens>, AppError> {
        Ok(self.tokens.lock().await.get(&company_id).cloned())
    }

    async fn get_connection_status(
        &self,
        company_id: Uuid,
    ) -> Result<Option<QboConnectionStatus>, AppError> {
        Ok(self.statuses.lock().await.get(&company_id).cloned())
    }

    async fn update_tokens(
        &self,
        company_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().await;
        let record = tokens.get_mut(&company_id).ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "No active QuickBooks connection for company {}",
                company_id
            ))
        })?;
        record.access_token = access_token.to_string();
        record.refresh_token = refresh_token.to_string();
        record.token_expires_at = expires_at;

        if let Some(status) = self.statuses.lock().await.get_mut(&company_id) {
            status.token_expires_at = expires_at;
        }
        Ok(())
    }

    async fn update_last_sync(&self, company_id: Uuid) -> Result<(), AppError> {
        if let Some(status) = self.statuses.lock().await.get_mut(&company_id) {
            status.last_sync_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn upsert_product(&self, product: &ProductUpsert) -> Result<(), AppError> {
        let mut products = self.products.lock().await;
        let key = (product.company_id, product.qbo_id.clone());
        let now = Utc::now();

        match products.get_mut(&key) {
            Some(existing) => {
                existing.name = product.name.clone();
                existing.description = product.description.clone();
                existing.product_type = product.product_type.as_str().to_string();
                existing.unit_price = product.unit_price;
                existing.is_active = product.is_active;
                existing.updated_at = now;
            }
            None => {
                products.insert(
                    key,
                    Product {
                        id: Uuid::new_v4(),
                        company_id: product.company_id,
                        name: product.name.clone(),
                        description: product.description.clone(),
                        product_type: product.product_type.as_str().to_string(),
                        unit_price: product.unit_price,
                        is_active: product.is_active,
                        qbo_id: product.qbo_id.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn upsert_account(&self, account: &AccountUpsert) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().await;
        let key = (account.company_id, account.qbo_id.clone());
        let now = Utc::now();

        match accounts.get_mut(&key) {
            Some(existing) => {
                existing.account_code = account.account_code.clone();
                existing.account_name = account.account_name.clone();
                existing.account_type = account.account_type.as_str().to_string();
                existing.is_active = account.is_active;
                existing.updated_at = now;
            }
            None => {
                accounts.insert(
                    key,
                    LedgerAccount {
                        id: Uuid::new_v4(),
                        company_id: account.company_id,
                        account_code: account.account_code.clone(),
                        account_name: account.account_name.clone(),
                        account_type: account.account_type.as_str().to_string(),
                        is_active: account.is_active,
                        qbo_id: account.qbo_id.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    async fn find_account(
        &self,
        company_id: Uuid,
        qbo_id: Option<&str>,
        name: &str,
    ) -> Result<Option<LedgerAccount>, AppError> {
        let accounts = self.accounts.lock().await;

        if let Some(qbo_id) = qbo_id {
            if let Some(account) = accounts.get(&(company_id, qbo_id.to_string())) {
                return Ok(Some(account.clone()));
            }
        }

        Ok(accounts
            .values()
            .find(|a| a.company_id == company_id && a.account_name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_pl_accounts(&self, company_id: Uuid) -> Result<Vec<LedgerAccount>, AppError> {
        let mut accounts: Vec<LedgerAccount> = self
            .accounts
            .lock()
            .await
            .values()
            .filter(|a| {
                a.company_id == company_id
                    && a.is_active
                    && matches!(a.account_type.as_str(), "revenue" | "expense")
            })
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.account_name.cmp(&b.account_name));
        Ok(accounts)
    }
}

#[async_trait]
impl ProfitLossStore for MemoryStore {
    async fn replace_for_year(
        &self,
        company_id: Uuid,
        fiscal_year: i32,
        entries: &[ProfitLossEntry],
    ) -> Result<(), AppError> {
        let mut rows = self.profit_loss.lock().await;
        rows.retain(|e| !(e.company_id == company_id && e.fiscal_year == fiscal_year));
        rows.extend_from_slice(entries);
        Ok(())
    }
}

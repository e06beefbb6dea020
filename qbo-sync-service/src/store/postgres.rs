//! PostgreSQL store for qbo-sync-service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    AccountUpsert, LedgerAccount, ProductUpsert, ProfitLossEntry, QboConnectionStatus, QboTokens,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::store::{AccountStore, ProductStore, ProfitLossStore, TokenStore};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "qbo-sync-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn get_tokens(&self, company_id: Uuid) -> Result<Option<QboTokens>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tokens"])
            .start_timer();

        let tokens = sqlx::query_as::<_, QboTokens>(
            r#"
            SELECT company_id, qbo_realm_id, access_token, refresh_token, token_expires_at
            FROM qbo_connections
            WHERE company_id = $1 AND is_active
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load tokens: {}", e)))?;

        timer.observe_duration();

        Ok(tokens)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn get_connection_status(
        &self,
        company_id: Uuid,
    ) -> Result<Option<QboConnectionStatus>, AppError> {
        let status = sqlx::query_as::<_, QboConnectionStatus>(
            r#"
            SELECT id, is_active, last_sync_at, token_expires_at, created_at
            FROM qbo_connections
            WHERE company_id = $1 AND is_active
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load connection status: {}", e))
        })?;

        Ok(status)
    }

    #[instrument(skip(self, access_token, refresh_token), fields(company_id = %company_id))]
    async fn update_tokens(
        &self,
        company_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_tokens"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE qbo_connections
            SET access_token = $2, refresh_token = $3, token_expires_at = $4, updated_at = NOW()
            WHERE company_id = $1 AND is_active
            "#,
        )
        .bind(company_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update tokens: {}", e)))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No active QuickBooks connection for company {}",
                company_id
            )));
        }

        info!("Stored refreshed QuickBooks tokens");
        Ok(())
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn update_last_sync(&self, company_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE qbo_connections
            SET last_sync_at = NOW(), updated_at = NOW()
            WHERE company_id = $1 AND is_active
            "#,
        )
        .bind(company_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record last sync: {}", e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl ProductStore for PgStore {
    #[instrument(skip(self, product), fields(company_id = %product.company_id, qbo_id = %product.qbo_id))]
    async fn upsert_product(&self, product: &ProductUpsert) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_product"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO products (id, company_id, name, description, product_type, unit_price, is_active, qbo_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (company_id, qbo_id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                product_type = EXCLUDED.product_type,
                unit_price = EXCLUDED.unit_price,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.company_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.product_type.as_str())
        .bind(product.unit_price)
        .bind(product.is_active)
        .bind(&product.qbo_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to upsert product: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    #[instrument(skip(self, account), fields(company_id = %account.company_id, qbo_id = %account.qbo_id))]
    async fn upsert_account(&self, account: &AccountUpsert) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_account"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO chart_of_accounts (id, company_id, account_code, account_name, account_type, is_active, qbo_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (company_id, qbo_id) DO UPDATE
            SET account_code = EXCLUDED.account_code,
                account_name = EXCLUDED.account_name,
                account_type = EXCLUDED.account_type,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account.company_id)
        .bind(&account.account_code)
        .bind(&account.account_name)
        .bind(account.account_type.as_str())
        .bind(account.is_active)
        .bind(&account.qbo_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to upsert account: {}", e)))?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn find_account(
        &self,
        company_id: Uuid,
        qbo_id: Option<&str>,
        name: &str,
    ) -> Result<Option<LedgerAccount>, AppError> {
        let account = sqlx::query_as::<_, LedgerAccount>(
            r#"
            SELECT id, company_id, account_code, account_name, account_type, is_active, qbo_id, created_at, updated_at
            FROM chart_of_accounts
            WHERE company_id = $1
              AND (($2::varchar IS NOT NULL AND qbo_id = $2) OR LOWER(account_name) = LOWER($3))
            ORDER BY (qbo_id = $2) DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .bind(qbo_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find account: {}", e)))?;

        Ok(account)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn list_pl_accounts(&self, company_id: Uuid) -> Result<Vec<LedgerAccount>, AppError> {
        let accounts = sqlx::query_as::<_, LedgerAccount>(
            r#"
            SELECT id, company_id, account_code, account_name, account_type, is_active, qbo_id, created_at, updated_at
            FROM chart_of_accounts
            WHERE company_id = $1 AND is_active AND account_type IN ('revenue', 'expense')
            ORDER BY account_name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list accounts: {}", e)))?;

        Ok(accounts)
    }
}

#[async_trait]
impl ProfitLossStore for PgStore {
    #[instrument(skip(self, entries), fields(company_id = %company_id, fiscal_year = fiscal_year, entry_count = entries.len()))]
    async fn replace_for_year(
        &self,
        company_id: Uuid,
        fiscal_year: i32,
        entries: &[ProfitLossEntry],
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_profit_loss"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM profit_loss_data WHERE company_id = $1 AND fiscal_year = $2")
            .bind(company_id)
            .bind(fiscal_year)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to clear P&L rows: {}", e))
            })?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO profit_loss_data (
                    id, company_id, account_id, account_name, account_type, qbo_account_id,
                    report_date, fiscal_year, fiscal_quarter, fiscal_month,
                    current_month, quarter_to_date, year_to_date,
                    budget_current_month, budget_quarter_to_date, budget_year_to_date,
                    variance_current_month, variance_quarter_to_date, variance_year_to_date,
                    is_estimated
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(entry.company_id)
            .bind(entry.account_id)
            .bind(&entry.account_name)
            .bind(entry.account_type.as_str())
            .bind(&entry.qbo_account_id)
            .bind(entry.report_date)
            .bind(entry.fiscal_year)
            .bind(entry.fiscal_quarter)
            .bind(entry.fiscal_month)
            .bind(entry.current_month)
            .bind(entry.quarter_to_date)
            .bind(entry.year_to_date)
            .bind(entry.budget_current_month)
            .bind(entry.budget_quarter_to_date)
            .bind(entry.budget_year_to_date)
            .bind(entry.variance_current_month)
            .bind(entry.variance_quarter_to_date)
            .bind(entry.variance_year_to_date)
            .bind(entry.is_estimated)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert P&L row: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit P&L replace: {}", e))
        })?;

        timer.observe_duration();

        info!(rows = entries.len(), "Replaced P&L entries for fiscal year");
        Ok(())
    }
}

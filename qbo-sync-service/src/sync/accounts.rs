//! Account reconciliation: QBO chart of accounts into the local chart.

use uuid::Uuid;

use crate::models::{AccountType, AccountUpsert};
use crate::services::QboClient;
use crate::store::AccountStore;
use crate::sync::{SyncError, SyncedEntity};

/// Upsert every remote account keyed on (company_id, qbo_id), translating
/// QBO's type taxonomy into the local categories. Same per-record fault
/// isolation as the item reconciler.
pub async fn sync_accounts<S: AccountStore>(
    qbo: &QboClient,
    store: &S,
    company_id: Uuid,
) -> Result<(usize, Vec<SyncedEntity>), SyncError> {
    let accounts = qbo.query_accounts(true).await?;
    tracing::info!(count = accounts.len(), "Fetched QuickBooks accounts");

    let mut count = 0;
    let mut found = Vec::with_capacity(accounts.len());

    for account in accounts {
        let account_type = account
            .account_type
            .as_deref()
            .map(AccountType::from_qbo)
            .unwrap_or(AccountType::Asset);

        let upsert = AccountUpsert {
            company_id,
            account_code: account.acct_num.clone().unwrap_or_else(|| account.id.clone()),
            account_name: account.name.clone(),
            account_type,
            is_active: account.active.unwrap_or(true),
            qbo_id: account.id.clone(),
        };

        match store.upsert_account(&upsert).await {
            Ok(()) => {
                count += 1;
                found.push(SyncedEntity {
                    name: account.name,
                    id: account.id,
                    entity_type: account_type.as_str().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    qbo_id = %upsert.qbo_id,
                    error = %e,
                    "Failed to upsert account; skipping"
                );
            }
        }
    }

    Ok((count, found))
}

//! Item reconciliation: QBO items into the product catalog.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{ProductType, ProductUpsert};
use crate::services::QboClient;
use crate::store::ProductStore;
use crate::sync::{SyncError, SyncedEntity};

/// Upsert every remote item keyed on (company_id, qbo_id). A single bad
/// record is logged and skipped rather than aborting the batch.
pub async fn sync_items<S: ProductStore>(
    qbo: &QboClient,
    store: &S,
    company_id: Uuid,
) -> Result<(usize, Vec<SyncedEntity>), SyncError> {
    let items = qbo.query_items().await?;
    tracing::info!(count = items.len(), "Fetched QuickBooks items");

    let mut count = 0;
    let mut found = Vec::with_capacity(items.len());

    for item in items {
        let product_type = ProductType::from_qbo(item.item_type.as_deref());
        let product = ProductUpsert {
            company_id,
            name: item.name.clone(),
            description: item.description.clone(),
            product_type,
            unit_price: item.unit_price.and_then(|p| Decimal::try_from(p).ok()),
            is_active: item.active.unwrap_or(true),
            qbo_id: item.id.clone(),
        };

        match store.upsert_product(&product).await {
            Ok(()) => {
                count += 1;
                found.push(SyncedEntity {
                    name: item.name,
                    id: item.id,
                    entity_type: product_type.as_str().to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    qbo_id = %product.qbo_id,
                    error = %e,
                    "Failed to upsert product; skipping"
                );
            }
        }
    }

    Ok((count, found))
}

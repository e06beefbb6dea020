//! Sync orchestrator tests against the in-memory store and a mock
//! QuickBooks server. No external dependencies required.

mod common;

use chrono::{Duration, Utc};
use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qbo_sync_service::models::AccountType;
use qbo_sync_service::services::TokenRefresher;
use qbo_sync_service::store::MemoryStore;
use qbo_sync_service::sync::{run_company_sync, SyncError};

async fn fresh_setup() -> (MockServer, MemoryStore, TokenRefresher, Uuid) {
    init_tracing();
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let refresher = TokenRefresher::new(&qbo_config_for(&server));
    let company_id = Uuid::new_v4();
    store
        .seed_connection(
            company_id,
            "realm-1",
            "seed-access",
            "seed-refresh",
            Utc::now() + Duration::hours(1),
        )
        .await;
    (server, store, refresher, company_id)
}

#[tokio::test]
async fn maps_item_types_and_mirrors_active_flag() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_happy_path(&server).await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.items_count, 3);

    let products = store.products().await;
    assert_eq!(products.len(), 3);
    assert_eq!(
        products
            .iter()
            .filter(|p| p.product_type == "product")
            .count(),
        2
    );
    assert_eq!(
        products
            .iter()
            .filter(|p| p.product_type == "service")
            .count(),
        1
    );

    let sprinkler = products.iter().find(|p| p.qbo_id == "12").unwrap();
    assert!(!sprinkler.is_active);
    assert_eq!(sprinkler.unit_price, Some(Decimal::new(200, 2)));

    let fountain = products.iter().find(|p| p.qbo_id == "11").unwrap();
    assert!(fountain.is_active);
    assert_eq!(fountain.description.as_deref(), Some("Garden rock fountain"));
}

#[tokio::test]
async fn translates_account_taxonomy() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_happy_path(&server).await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.accounts_count, 5);

    let accounts = store.accounts().await;
    let type_of = |qbo_id: &str| {
        accounts
            .iter()
            .find(|a| a.qbo_id == qbo_id)
            .unwrap()
            .account_type
            .clone()
    };

    assert_eq!(type_of("35"), "asset");
    assert_eq!(type_of("79"), "revenue");
    assert_eq!(type_of("90"), "expense");
    assert_eq!(type_of("63"), "expense");

    let found_types: Vec<&str> = summary
        .accounts_found
        .iter()
        .map(|a| a.entity_type.as_str())
        .collect();
    assert!(found_types.contains(&"asset"));
    assert!(found_types.contains(&"revenue"));
}

#[tokio::test]
async fn normalizes_parenthesised_expense_rows() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_happy_path(&server).await;

    let config = qbo_config_for(&server);
    run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    let entries = store.profit_loss_entries().await;
    let rent = entries
        .iter()
        .find(|e| e.account_name == "Office Rent")
        .unwrap();

    assert_eq!(rent.account_type, AccountType::Expense);
    assert_eq!(rent.year_to_date, Decimal::new(120000, 2));
    assert_eq!(rent.current_month, Decimal::new(10000, 2));
    assert_eq!(rent.quarter_to_date, Decimal::new(30000, 2));
    assert!(rent.account_id.is_some());
    assert!(!rent.is_estimated);
}

#[tokio::test]
async fn chart_of_accounts_type_is_authoritative() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_items(&server, items_body()).await;
    mount_accounts(&server, accounts_body()).await;

    // The report misfiles a revenue account under Expenses; the synced chart
    // must win.
    mount_profit_and_loss(
        &server,
        serde_json::json!({
            "Rows": {
                "Row": [
                    {
                        "type": "Section",
                        "group": "Expenses",
                        "Rows": {
                            "Row": [
                                { "type": "Data", "ColData": [{ "value": "Sales of Product Income", "id": "79" }, { "value": "500.00" }] }
                            ]
                        }
                    }
                ]
            }
        }),
    )
    .await;

    let config = qbo_config_for(&server);
    run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    let entries = store.profit_loss_entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].account_type, AccountType::Revenue);
    assert_eq!(entries[0].qbo_account_id.as_deref(), Some("79"));
}

#[tokio::test]
async fn running_twice_is_idempotent() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_happy_path(&server).await;

    let config = qbo_config_for(&server);
    let first = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();
    let second = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    assert_eq!(first.items_count, second.items_count);
    assert_eq!(first.accounts_count, second.accounts_count);
    assert_eq!(first.pl_data_count, second.pl_data_count);

    // Upserts must not duplicate rows, and the P&L replace must not
    // accumulate entries across runs.
    assert_eq!(store.products().await.len(), first.items_count);
    assert_eq!(store.accounts().await.len(), first.accounts_count);
    assert_eq!(store.profit_loss_entries().await.len(), first.pl_data_count);

    assert!(store.last_sync_at(company_id).await.is_some());
}

#[tokio::test]
async fn full_replace_drops_stale_accounts() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_items(&server, items_body()).await;
    mount_accounts(&server, accounts_body()).await;

    // First run sees the full report, second run a report where Office Rent
    // no longer appears.
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/ProfitAndLoss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pl_report_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_profit_and_loss(
        &server,
        serde_json::json!({
            "Rows": {
                "Row": [
                    {
                        "type": "Section",
                        "group": "Income",
                        "Rows": {
                            "Row": [
                                { "type": "Data", "ColData": [{ "value": "Sales of Product Income", "id": "79" }, { "value": "3,500.00" }] }
                            ]
                        }
                    }
                ]
            }
        }),
    )
    .await;

    let config = qbo_config_for(&server);
    run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();
    assert_eq!(store.profit_loss_entries().await.len(), 3);

    run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    let entries = store.profit_loss_entries().await;
    assert_eq!(entries.len(), 1);
    assert!(!entries.iter().any(|e| e.account_name == "Office Rent"));
}

#[tokio::test]
async fn primary_report_success_skips_fallback_tiers() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_happy_path(&server).await;

    // Fallback monotonicity: the trial balance endpoint must not be hit.
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/TrialBalance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(trial_balance_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = qbo_config_for(&server);
    run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    let entries = store.profit_loss_entries().await;
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| !e.is_estimated));
}

#[tokio::test]
async fn empty_report_falls_back_to_trial_balance() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_items(&server, items_body()).await;
    mount_accounts(&server, accounts_body()).await;
    mount_profit_and_loss(&server, empty_report_body()).await;
    mount_trial_balance(&server, trial_balance_body()).await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    // The trial balance carries a bank account too; only rows resolving to
    // revenue/expense chart accounts belong in the P&L.
    let entries = store.profit_loss_entries().await;
    assert_eq!(summary.pl_data_count, 2);
    assert!(!entries.iter().any(|e| e.account_name == "Checking"));

    let sales = entries
        .iter()
        .find(|e| e.account_name == "Sales of Product Income")
        .unwrap();
    assert_eq!(sales.account_type, AccountType::Revenue);
    assert_eq!(sales.year_to_date, Decimal::new(300000, 2));
}

#[tokio::test]
async fn no_report_data_writes_flagged_placeholders() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_items(&server, items_body()).await;
    mount_accounts(&server, accounts_body()).await;
    mount_profit_and_loss(&server, empty_report_body()).await;
    mount_trial_balance(&server, empty_report_body()).await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    // One placeholder per active revenue/expense account: Sales of Product
    // Income, Job Materials, Office Rent (Miscellaneous is inactive).
    assert_eq!(summary.pl_data_count, 3);

    let entries = store.profit_loss_entries().await;
    assert!(entries.iter().all(|e| e.is_estimated));
    assert!(entries.iter().all(|e| e.year_to_date == Decimal::ZERO));
    assert!(entries.iter().all(|e| e.account_id.is_some()));
}

#[tokio::test]
async fn report_fetch_failure_writes_sample_dataset() {
    let (server, store, refresher, company_id) = fresh_setup().await;
    mount_items(&server, items_body()).await;
    mount_accounts(&server, accounts_body()).await;

    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/ProfitAndLoss"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;
    // Tier C fires on request failure without consulting the trial balance.
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/TrialBalance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(trial_balance_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    assert!(summary.pl_data_count > 0);
    let entries = store.profit_loss_entries().await;
    assert!(entries.iter().all(|e| e.is_estimated));
    assert!(entries
        .iter()
        .any(|e| e.account_type == AccountType::Revenue));
}

#[tokio::test]
async fn token_expiring_exactly_now_is_refreshed_first() {
    init_tracing();
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let refresher = TokenRefresher::new(&qbo_config_for(&server));
    let company_id = Uuid::new_v4();

    let now = Utc::now();
    store
        .seed_connection(company_id, "realm-1", "seed-access", "seed-refresh", now)
        .await;

    mount_token_refresh(&server).await;

    // Every data call must carry the refreshed token.
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/query"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/ProfitAndLoss"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pl_report_body()))
        .mount(&server)
        .await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, now)
        .await
        .unwrap();

    assert!(summary.pl_data_count > 0);
    let tokens = store.stored_tokens(company_id).await.unwrap();
    assert_eq!(tokens.access_token, "new-access");
    assert_eq!(tokens.refresh_token, "new-refresh");
}

#[tokio::test]
async fn failed_refresh_aborts_the_run() {
    init_tracing();
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let refresher = TokenRefresher::new(&qbo_config_for(&server));
    let company_id = Uuid::new_v4();

    let now = Utc::now();
    store
        .seed_connection(
            company_id,
            "realm-1",
            "seed-access",
            "seed-refresh",
            now - Duration::hours(2),
        )
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v1/tokens/bearer"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "refresh token has been revoked"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // No data may be fetched with a dead token.
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_body()))
        .expect(0)
        .mount(&server)
        .await;

    let config = qbo_config_for(&server);
    let err = run_company_sync(&store, &config, &refresher, company_id, now)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::TokenRefresh(_)));
    assert!(store.products().await.is_empty());
    assert!(store.profit_loss_entries().await.is_empty());
    assert!(store.last_sync_at(company_id).await.is_none());
}

#[tokio::test]
async fn missing_connection_is_actionable() {
    init_tracing();
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let refresher = TokenRefresher::new(&qbo_config_for(&server));

    let config = qbo_config_for(&server);
    let err = run_company_sync(&store, &config, &refresher, Uuid::new_v4(), Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::ConnectionNotFound));
    assert!(err.to_string().contains("reconnect"));
}

#[tokio::test]
async fn item_fetch_failure_does_not_abort_siblings() {
    let (server, store, refresher, company_id) = fresh_setup().await;

    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/query"))
        .and(wiremock::matchers::query_param("query", ITEM_QUERY))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "Fault": { "Error": [{ "Message": "InvalidQuery", "Detail": "Bad item query" }] }
        })))
        .mount(&server)
        .await;
    mount_accounts(&server, accounts_body()).await;
    mount_profit_and_loss(&server, pl_report_body()).await;

    let config = qbo_config_for(&server);
    let summary = run_company_sync(&store, &config, &refresher, company_id, Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.items_count, 0);
    assert!(summary.items_found.is_empty());
    assert_eq!(summary.accounts_count, 5);
    assert!(summary.pl_data_count > 0);
    assert!(store.last_sync_at(company_id).await.is_some());
}

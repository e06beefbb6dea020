//! Common test utilities for qbo-sync-service tests.
#![allow(dead_code)]

use std::sync::Once;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qbo_sync_service::config::{AuthConfig, DatabaseConfig, QboConfig, QboSyncConfig};
use qbo_sync_service::startup::Application;
use qbo_sync_service::store::PgStore;
use service_core::auth::AccessTokenClaims;
use service_core::config::Config as CommonConfig;

pub const JWT_SECRET: &str = "test-jwt-secret";

pub const ITEM_QUERY: &str = "SELECT * FROM Item MAXRESULTS 1000";
pub const ACCOUNT_QUERY: &str = "SELECT * FROM Account WHERE Active IN (true, false) MAXRESULTS 1000";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,qbo_sync_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Build a QboConfig pointed at a mock QuickBooks server.
pub fn qbo_config_for(server: &MockServer) -> QboConfig {
    QboConfig {
        client_id: "test-client".to_string(),
        client_secret: Secret::new("test-client-secret".to_string()),
        api_base_url: server.uri(),
        token_url: format!("{}/oauth2/v1/tokens/bearer", server.uri()),
    }
}

/// Issue a caller access token the service will accept.
pub fn issue_token() -> String {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
        exp: now + 3600,
        iat: now,
        jti: Some(Uuid::new_v4().to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode test token")
}

/// Three catalog items: two inventory-tracked, one service.
pub fn items_body() -> Value {
    json!({
        "QueryResponse": {
            "Item": [
                {
                    "Id": "11",
                    "Name": "Rock Fountain",
                    "Description": "Garden rock fountain",
                    "Type": "Inventory",
                    "UnitPrice": 275.0,
                    "Active": true
                },
                {
                    "Id": "12",
                    "Name": "Sprinkler Head",
                    "Type": "Inventory",
                    "UnitPrice": 2.0,
                    "Active": false
                },
                {
                    "Id": "13",
                    "Name": "Gardening",
                    "Type": "Service",
                    "UnitPrice": 35.0,
                    "Active": true
                }
            ]
        }
    })
}

pub fn accounts_body() -> Value {
    json!({
        "QueryResponse": {
            "Account": [
                { "Id": "35", "Name": "Checking", "AcctNum": "1000", "AccountType": "Bank", "Active": true },
                { "Id": "79", "Name": "Sales of Product Income", "AcctNum": "4000", "AccountType": "Income", "Active": true },
                { "Id": "90", "Name": "Job Materials", "AcctNum": "5000", "AccountType": "Cost of Goods Sold", "Active": true },
                { "Id": "63", "Name": "Office Rent", "AcctNum": "6100", "AccountType": "Expense", "Active": true },
                { "Id": "64", "Name": "Miscellaneous", "AccountType": "Expense", "Active": false }
            ]
        }
    })
}

/// A P&L report exercising sections, thousands separators, parenthesised
/// negatives, and subtotal rows.
pub fn pl_report_body() -> Value {
    json!({
        "Header": { "ReportName": "ProfitAndLoss" },
        "Rows": {
            "Row": [
                {
                    "type": "Section",
                    "group": "Income",
                    "Header": { "ColData": [{ "value": "Income" }] },
                    "Rows": {
                        "Row": [
                            { "type": "Data", "ColData": [{ "value": "Sales of Product Income", "id": "79" }, { "value": "3,000.00" }] }
                        ]
                    },
                    "Summary": { "ColData": [{ "value": "Total Income" }, { "value": "3000.00" }] }
                },
                {
                    "type": "Section",
                    "group": "COGS",
                    "Rows": {
                        "Row": [
                            { "type": "Data", "ColData": [{ "value": "Job Materials", "id": "90" }, { "value": "405.00" }] }
                        ]
                    }
                },
                {
                    "type": "Section",
                    "group": "Expenses",
                    "Rows": {
                        "Row": [
                            { "type": "Data", "ColData": [{ "value": "Office Rent", "id": "63" }, { "value": "(1200.00)" }] },
                            { "type": "Data", "ColData": [{ "value": "Total Expenses" }, { "value": "1200.00" }] }
                        ]
                    }
                },
                { "type": "Data", "group": "NetIncome", "ColData": [{ "value": "NET INCOME" }, { "value": "2205.00" }] }
            ]
        }
    })
}

pub fn empty_report_body() -> Value {
    json!({
        "Header": { "ReportName": "ProfitAndLoss" },
        "Rows": {}
    })
}

pub fn trial_balance_body() -> Value {
    json!({
        "Header": { "ReportName": "TrialBalance" },
        "Rows": {
            "Row": [
                { "ColData": [{ "value": "Checking" }, { "value": "1,350.00" }, { "value": "" }] },
                { "ColData": [{ "value": "Sales of Product Income" }, { "value": "" }, { "value": "3,000.00" }] },
                { "ColData": [{ "value": "Office Rent" }, { "value": "1200.00" }, { "value": "" }] }
            ]
        }
    })
}

/// Mount the standard happy-path QBO mocks: items, accounts, and a P&L
/// report.
pub async fn mount_happy_path(server: &MockServer) {
    mount_items(server, items_body()).await;
    mount_accounts(server, accounts_body()).await;
    mount_profit_and_loss(server, pl_report_body()).await;
}

pub async fn mount_items(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/query"))
        .and(query_param("query", ITEM_QUERY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_accounts(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/query"))
        .and(query_param("query", ACCOUNT_QUERY))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_profit_and_loss(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/ProfitAndLoss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_trial_balance(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v3/company/realm-1/reports/TrialBalance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_token_refresh(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/v1/tokens/bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// A full application wired to a throwaway HTTP port, a mock QuickBooks
/// server, and the database at TEST_DATABASE_URL.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: PgStore,
    pub qbo_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let database_url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set to run database-backed tests");

        let qbo_server = MockServer::start().await;

        let config = QboSyncConfig {
            common: CommonConfig { port: 0 },
            service_name: "qbo-sync-service-test".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: database_url,
                max_connections: 2,
                min_connections: 1,
            },
            qbo: qbo_config_for(&qbo_server),
            auth: AuthConfig {
                jwt_secret: Secret::new(JWT_SECRET.to_string()),
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let store = app.store().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the HTTP server to answer its health endpoint.
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            qbo_server,
        }
    }

    /// Seed an active connection, as the connect flow would have stored it.
    pub async fn seed_connection(&self, company_id: Uuid, expires_in_secs: i64) {
        sqlx::query(
            r#"
            INSERT INTO qbo_connections (company_id, qbo_realm_id, access_token, refresh_token, token_expires_at)
            VALUES ($1, 'realm-1', 'seed-access', 'seed-refresh', NOW() + make_interval(secs => $2))
            ON CONFLICT (company_id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_expires_at = EXCLUDED.token_expires_at,
                is_active = TRUE
            "#,
        )
        .bind(company_id)
        .bind(expires_in_secs as f64)
        .execute(self.store.pool())
        .await
        .expect("Failed to seed connection");
    }
}

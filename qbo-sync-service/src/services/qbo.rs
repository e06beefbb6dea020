//! QuickBooks Online API client.
//!
//! Thin wrapper over the company-scoped query endpoint and the report
//! endpoints. Query calls are idempotent GETs and retried with bounded
//! exponential backoff on transient failures; report fetches are single
//! attempts because their failure drives the caller's fallback chain.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::services::metrics::QBO_REQUESTS;

const QBO_QUERY_LIMIT: u32 = 1000;

#[derive(Debug, Error)]
pub enum QboApiError {
    #[error("QuickBooks request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("QuickBooks API error ({status}): {detail}")]
    Api { status: u16, detail: String },
}

/// Item record as returned by the QBO query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QboItem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(rename = "UnitPrice", default)]
    pub unit_price: Option<f64>,
    #[serde(rename = "Active", default)]
    pub active: Option<bool>,
}

/// Account record as returned by the QBO query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QboAccount {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "AcctNum", default)]
    pub acct_num: Option<String>,
    #[serde(rename = "AccountType", default)]
    pub account_type: Option<String>,
    #[serde(rename = "Active", default)]
    pub active: Option<bool>,
}

/// Client bound to one company's realm and access token.
#[derive(Clone)]
pub struct QboClient {
    client: Client,
    base_url: String,
    realm_id: String,
    access_token: String,
}

impl QboClient {
    pub fn new(base_url: &str, realm_id: &str, access_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            realm_id: realm_id.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn company_url(&self, path: &str) -> String {
        format!("{}/v3/company/{}/{}", self.base_url, self.realm_id, path)
    }

    /// Fetch all items in the company catalog.
    pub async fn query_items(&self) -> Result<Vec<QboItem>, QboApiError> {
        let body = self
            .query(&format!("SELECT * FROM Item MAXRESULTS {}", QBO_QUERY_LIMIT))
            .await?;
        Ok(parse_query_entities(&body, "Item"))
    }

    /// Fetch the chart of accounts.
    pub async fn query_accounts(&self, include_inactive: bool) -> Result<Vec<QboAccount>, QboApiError> {
        let query = if include_inactive {
            format!(
                "SELECT * FROM Account WHERE Active IN (true, false) MAXRESULTS {}",
                QBO_QUERY_LIMIT
            )
        } else {
            format!(
                "SELECT * FROM Account WHERE Active = true MAXRESULTS {}",
                QBO_QUERY_LIMIT
            )
        };
        let body = self.query(&query).await?;
        Ok(parse_query_entities(&body, "Account"))
    }

    /// Fetch the ProfitAndLoss report for the given date range.
    pub async fn fetch_profit_and_loss(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Value, QboApiError> {
        self.fetch_report("ProfitAndLoss", start_date, end_date).await
    }

    /// Fetch the TrialBalance report for the given date range.
    pub async fn fetch_trial_balance(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Value, QboApiError> {
        self.fetch_report("TrialBalance", start_date, end_date).await
    }

    /// Run a query against the company-scoped query endpoint, with bounded
    /// backoff on transient failures.
    async fn query(&self, query: &str) -> Result<Value, QboApiError> {
        let url = self.company_url("query");
        let url = url.as_str();

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(Duration::from_secs(10)))
            .build();

        backoff::future::retry(policy, || async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.access_token)
                .header("Accept", "application/json")
                .query(&[("query", query)])
                .send()
                .await
                .map_err(classify_transport_error)?;

            let status = response.status();
            QBO_REQUESTS
                .with_label_values(&["query", status.as_str()])
                .inc();

            let body = response
                .text()
                .await
                .map_err(classify_transport_error)?;

            if status.is_success() {
                serde_json::from_str::<Value>(&body).map_err(|e| {
                    backoff::Error::permanent(QboApiError::Api {
                        status: status.as_u16(),
                        detail: format!("invalid JSON response: {}", e),
                    })
                })
            } else {
                let error = QboApiError::Api {
                    status: status.as_u16(),
                    detail: extract_fault(&body, status.as_u16()),
                };
                if status.is_server_error() || status.as_u16() == 429 {
                    Err(backoff::Error::transient(error))
                } else {
                    Err(backoff::Error::permanent(error))
                }
            }
        })
        .await
    }

    async fn fetch_report(
        &self,
        report: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Value, QboApiError> {
        let url = self.company_url(&format!("reports/{}", report));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .query(&[
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        QBO_REQUESTS
            .with_label_values(&["report", status.as_str()])
            .inc();

        let body = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<Value>(&body).map_err(|e| QboApiError::Api {
                status: status.as_u16(),
                detail: format!("invalid JSON response: {}", e),
            })
        } else {
            Err(QboApiError::Api {
                status: status.as_u16(),
                detail: extract_fault(&body, status.as_u16()),
            })
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> backoff::Error<QboApiError> {
    if err.is_timeout() || err.is_connect() {
        backoff::Error::transient(QboApiError::Http(err))
    } else {
        backoff::Error::permanent(QboApiError::Http(err))
    }
}

/// Pull the entity array out of a `QueryResponse` envelope, tolerating its
/// absence (an empty result set omits the key entirely).
fn parse_query_entities<T: for<'de> Deserialize<'de>>(body: &Value, entity: &str) -> Vec<T> {
    body["QueryResponse"][entity]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| match serde_json::from_value(row.clone()) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        tracing::warn!(entity = entity, error = %e, "Skipping unparseable QBO entity");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// QBO error responses come in a `Fault` structure.
fn extract_fault(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v["Fault"]["Error"][0]["Detail"]
                .as_str()
                .or_else(|| v["Fault"]["Error"][0]["Message"].as_str())
                .or_else(|| v["message"].as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

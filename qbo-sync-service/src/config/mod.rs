//! Configuration module for qbo-sync-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct QboSyncConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub qbo: QboConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Intuit OAuth application credentials and endpoints.
#[derive(Debug, Clone)]
pub struct QboConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl QboSyncConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "qbo-sync-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            qbo: QboConfig {
                client_id: env::var("QBO_CLIENT_ID").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("QBO_CLIENT_ID is required"))
                })?,
                client_secret: Secret::new(env::var("QBO_CLIENT_SECRET").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("QBO_CLIENT_SECRET is required"))
                })?),
                api_base_url: env::var("QBO_API_BASE_URL")
                    .unwrap_or_else(|_| "https://quickbooks.api.intuit.com".to_string()),
                token_url: env::var("QBO_TOKEN_URL").unwrap_or_else(|_| {
                    "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer".to_string()
                }),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(env::var("JWT_SECRET").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("JWT_SECRET is required"))
                })?),
            },
        })
    }
}

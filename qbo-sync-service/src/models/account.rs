//! Chart-of-accounts model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account types following standard accounting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    /// Translate QuickBooks' account-type taxonomy to the local categories.
    /// Unrecognized types land on `Asset`, the conservative default.
    pub fn from_qbo(qbo_type: &str) -> Self {
        match qbo_type {
            "Asset" | "Bank" | "Fixed Asset" | "Other Asset" | "Other Current Asset"
            | "Accounts Receivable" => Self::Asset,
            "Liability" | "Credit Card" | "Long Term Liability" | "Other Current Liability"
            | "Accounts Payable" => Self::Liability,
            "Equity" => Self::Equity,
            "Income" | "Revenue" | "Other Income" => Self::Revenue,
            "Expense" | "Other Expense" | "Cost of Goods Sold" => Self::Expense,
            _ => Self::Asset,
        }
    }

    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Chart-of-accounts row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: Uuid,
    pub company_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub is_active: bool,
    pub qbo_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerAccount {
    /// Get parsed account type.
    pub fn parsed_type(&self) -> Option<AccountType> {
        match self.account_type.as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "revenue" => Some(AccountType::Revenue),
            "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }
}

/// Input for upserting an account keyed on (company_id, qbo_id).
#[derive(Debug, Clone)]
pub struct AccountUpsert {
    pub company_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub is_active: bool,
    pub qbo_id: String,
}

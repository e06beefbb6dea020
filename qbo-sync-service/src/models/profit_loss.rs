//! Profit & loss period entries.
//!
//! Rows for a fiscal year are fully replaced on every sync run, so the
//! struct doubles as the insert shape.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::AccountType;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProfitLossEntry {
    pub company_id: Uuid,
    pub account_id: Option<Uuid>,
    pub account_name: String,
    pub account_type: AccountType,
    pub qbo_account_id: Option<String>,
    pub report_date: NaiveDate,
    pub fiscal_year: i32,
    pub fiscal_quarter: i32,
    pub fiscal_month: i32,
    pub current_month: Decimal,
    pub quarter_to_date: Decimal,
    pub year_to_date: Decimal,
    pub budget_current_month: Decimal,
    pub budget_quarter_to_date: Decimal,
    pub budget_year_to_date: Decimal,
    pub variance_current_month: Decimal,
    pub variance_quarter_to_date: Decimal,
    pub variance_year_to_date: Decimal,
    pub is_estimated: bool,
}

/// Fiscal partition of a calendar date (calendar-aligned fiscal year).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiscalPeriod {
    pub year: i32,
    pub quarter: i32,
    pub month: i32,
    pub report_date: NaiveDate,
}

impl FiscalPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: ((date.month0() / 3) + 1) as i32,
            month: date.month() as i32,
            report_date: date,
        }
    }

    /// First day of the fiscal year.
    pub fn year_start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, 1, 1).expect("January 1 is always valid")
    }
}

//! Financial report tree parsing and traversal.
//!
//! QBO reports arrive as a recursive Section/Row structure. The JSON is
//! parsed once into a typed tree, then walked depth-first carrying the
//! current section classification down into nested rows.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::models::AccountType;

/// Section classification carried down the report tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Revenue,
    CostOfGoodsSold,
    Expense,
}

impl SectionKind {
    /// Classify a section by its `group` tag.
    pub fn from_group(group: &str) -> Option<Self> {
        match group {
            "Income" | "Revenue" | "OtherIncome" => Some(Self::Revenue),
            "COGS" => Some(Self::CostOfGoodsSold),
            "Expenses" | "OtherExpenses" => Some(Self::Expense),
            _ => None,
        }
    }

    /// The chart-of-accounts type this section maps to.
    pub fn account_type(self) -> AccountType {
        match self {
            Self::Revenue => AccountType::Revenue,
            Self::CostOfGoodsSold | Self::Expense => AccountType::Expense,
        }
    }
}

/// One node of the parsed report tree.
#[derive(Debug, Clone)]
pub enum ReportNode {
    Section {
        kind: Option<SectionKind>,
        children: Vec<ReportNode>,
    },
    Data {
        label: String,
        qbo_account_id: Option<String>,
        /// Nonzero amount of the row, if one parsed.
        amount: Option<Decimal>,
    },
}

/// A leaf account line extracted from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub name: String,
    pub qbo_account_id: Option<String>,
    /// Positive magnitude of the account's activity.
    pub amount: Decimal,
    pub kind: SectionKind,
}

/// Parse the `Rows` of a QBO report body into the typed tree.
pub fn parse_report(report: &Value) -> Vec<ReportNode> {
    parse_rows(&report["Rows"])
}

/// Parse a report and flatten it to account lines. `default_kind` applies to
/// rows outside any classified section (trial balances have no groups).
pub fn extract_lines(report: &Value, default_kind: SectionKind) -> Vec<ReportLine> {
    let nodes = parse_report(report);
    let mut lines = Vec::new();
    collect_lines(&nodes, default_kind, &mut lines);
    lines
}

fn parse_rows(value: &Value) -> Vec<ReportNode> {
    value["Row"]
        .as_array()
        .map(|rows| rows.iter().filter_map(parse_row).collect())
        .unwrap_or_default()
}

fn parse_row(row: &Value) -> Option<ReportNode> {
    // Sections nest through a `Rows` object; everything with `ColData` is a
    // data row.
    if row["type"].as_str() == Some("Section") || row["Rows"]["Row"].is_array() {
        let kind = row["group"].as_str().and_then(SectionKind::from_group);
        return Some(ReportNode::Section {
            kind,
            children: parse_rows(&row["Rows"]),
        });
    }

    let cols = row["ColData"].as_array()?;
    let first = cols.first()?;
    let label = first["value"].as_str()?.trim().to_string();
    if label.is_empty() {
        return None;
    }
    let qbo_account_id = first["id"].as_str().map(|s| s.to_string());

    // The rightmost parseable nonzero cell is the row's amount; trial
    // balance rows leave one of their debit/credit cells blank.
    let amount = cols[1..]
        .iter()
        .rev()
        .find_map(|c| parse_amount(c["value"].as_str()?).filter(|v| !v.is_zero()));

    Some(ReportNode::Data {
        label,
        qbo_account_id,
        amount,
    })
}

fn collect_lines(nodes: &[ReportNode], inherited: SectionKind, out: &mut Vec<ReportLine>) {
    for node in nodes {
        match node {
            ReportNode::Section { kind, children } => {
                collect_lines(children, kind.unwrap_or(inherited), out);
            }
            ReportNode::Data {
                label,
                qbo_account_id,
                amount,
            } => {
                if is_summary_label(label) {
                    continue;
                }
                let Some(amount) = amount else { continue };
                out.push(ReportLine {
                    name: label.clone(),
                    qbo_account_id: qbo_account_id.clone(),
                    amount: amount.abs(),
                    kind: inherited,
                });
            }
        }
    }
}

/// Subtotal and grand-total rows, not account lines. Case-sensitive on
/// purpose: "NET" only matches the report's own "NET INCOME"-style rows,
/// not account names like "Internet".
fn is_summary_label(label: &str) -> bool {
    label.contains("Total") || label.contains("NET")
}

/// Parse a report amount cell. Thousands separators and currency symbols are
/// stripped; parenthesised numbers are negative.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative =
        (trimmed.starts_with('(') && trimmed.ends_with(')')) || trimmed.starts_with('-');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let value: Decimal = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}

// src/reconcile/mod.rs
//! Folds freshly parsed receipts and available balances into the rows of the
//! published revenue dataset, replacing any earlier copy of the same fiscal
//! year.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::FiscalPeriod;
use crate::extractors::record::Record;
use crate::socrata::models::HistoricalRevenue;

/// One row of the published revenue dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueRow {
    #[serde(rename = "Revenue.Source")]
    pub revenue_source: String,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "Fund.Type")]
    pub fund_type: String,
    #[serde(rename = "Fiscal.Year")]
    pub fiscal_year: String,
    #[serde(rename = "Fiscal.Year.Shorthand")]
    pub fiscal_year_shorthand: i32,
}

impl RevenueRow {
    fn key(&self) -> (&str, &str, i32) {
        (&self.revenue_source, &self.fund_type, self.fiscal_year_shorthand)
    }

    /// Converts a published row; `None` when any cell is missing or unparseable.
    pub fn from_history(row: &HistoricalRevenue) -> Option<Self> {
        let present = |cell: &Option<String>| {
            cell.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some(Self {
            revenue_source: present(&row.revenue_source)?,
            amount: Decimal::from_str(&present(&row.amount)?).ok()?,
            fund_type: present(&row.fund_type)?,
            fiscal_year: present(&row.fiscal_year)?,
            fiscal_year_shorthand: present(&row.fiscal_year_2)?.parse().ok()?,
        })
    }
}

/// Result of merging new records with the published history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub rows: Vec<RevenueRow>,
    /// Balance labels that matched no receipt row and were dropped.
    pub unmatched_balances: Vec<String>,
    /// Receipt labels dropped for lacking a fund type.
    pub uncategorized_receipts: Vec<String>,
    /// Published rows of the fiscal year being replaced.
    pub replaced_history_rows: usize,
    /// Published rows dropped for missing or unparseable cells.
    pub incomplete_history_rows: usize,
    /// Rows dropped because an earlier row had the same key.
    pub duplicate_rows: usize,
}

pub struct Reconciler {
    period: FiscalPeriod,
}

impl Reconciler {
    pub fn new(period: FiscalPeriod) -> Self {
        Self { period }
    }

    /// Adds each non-zero available balance to the receipts with the same
    /// label and stamps the fiscal period. Percentages are not carried over.
    pub fn merge_balances<'a>(
        &self,
        receipts: impl IntoIterator<Item = &'a Record>,
        balances: &[Record],
        result: &mut Reconciliation,
    ) -> Vec<RevenueRow> {
        let mut balance_by_label: HashMap<&str, Decimal> = HashMap::new();
        let mut balance_order: Vec<&str> = Vec::new();
        for balance in balances.iter().filter(|b| !b.amount.is_zero()) {
            let entry = balance_by_label.entry(balance.label.as_str()).or_insert_with(|| {
                balance_order.push(balance.label.as_str());
                Decimal::ZERO
            });
            *entry += balance.amount;
        }

        let mut matched: HashSet<&str> = HashSet::new();
        let mut rows = Vec::new();
        for receipt in receipts {
            let Some(fund_type) = receipt.category.as_deref() else {
                tracing::warn!("Dropping receipt '{}' without a fund type", receipt.label);
                result.uncategorized_receipts.push(receipt.label.clone());
                continue;
            };
            let balance = match balance_by_label.get_key_value(receipt.label.as_str()) {
                Some((label, amount)) => {
                    matched.insert(*label);
                    *amount
                }
                None => Decimal::ZERO,
            };
            rows.push(RevenueRow {
                revenue_source: receipt.label.clone(),
                amount: receipt.amount + balance,
                fund_type: fund_type.to_string(),
                fiscal_year: self.period.label.clone(),
                fiscal_year_shorthand: self.period.shorthand,
            });
        }

        for label in balance_order.into_iter().filter(|l| !matched.contains(l)) {
            // Usually a label spelled slightly differently in the two tables.
            tracing::warn!("Available balance '{}' matches no receipt; dropped", label);
            result.unmatched_balances.push(label.to_string());
        }
        rows
    }

    /// Builds the full dataset: new rows first, then every published row of
    /// other fiscal years, deduplicated on (label, fund type, fiscal year).
    pub fn reconcile<'a>(
        &self,
        receipts: impl IntoIterator<Item = &'a Record>,
        balances: &[Record],
        history: &[HistoricalRevenue],
    ) -> Reconciliation {
        let mut result = Reconciliation::default();
        let new_rows = self.merge_balances(receipts, balances, &mut result);
        tracing::info!("Prepared {} rows for fiscal year {}", new_rows.len(), self.period.label);

        let mut old_rows = Vec::with_capacity(history.len());
        for published in history {
            match RevenueRow::from_history(published) {
                Some(row) if row.fiscal_year_shorthand == self.period.shorthand => {
                    result.replaced_history_rows += 1;
                }
                Some(row) => old_rows.push(row),
                None => {
                    tracing::debug!("Dropping incomplete published row: {:?}", published);
                    result.incomplete_history_rows += 1;
                }
            }
        }

        let mut seen: HashSet<(String, String, i32)> = HashSet::new();
        for row in new_rows.into_iter().chain(old_rows) {
            let (label, fund, year) = row.key();
            if seen.insert((label.to_string(), fund.to_string(), year)) {
                result.rows.push(row);
            } else {
                tracing::debug!("Duplicate row dropped: {} / {} / {}", label, fund, year);
                result.duplicate_rows += 1;
            }
        }

        tracing::info!(
            "Reconciled {} rows ({} published rows replaced, {} incomplete, {} duplicates, {} unmatched balances)",
            result.rows.len(),
            result.replaced_history_rows,
            result.incomplete_history_rows,
            result.duplicate_rows,
            result.unmatched_balances.len()
        );
        result
    }
}

// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::pipeline::PipelineOutput;
use crate::extractors::record::Record;
use crate::reconcile::{Reconciliation, RevenueRow};
use crate::socrata::models::HistoricalRevenue;
use crate::utils::error::StorageError;

pub const RECEIPTS_HEADER: [&str; 4] = ["Revenue.Source", "Amount", "Percent", "Fund.Type"];
pub const BALANCES_HEADER: [&str; 3] = ["Revenue.Source", "Available.Balance", "Percent"];
const HISTORY_HEADER: [&str; 5] = ["revenue_source", "amount", "fund_type", "fiscal_year", "fiscal_year_2"];

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes receipts as `Revenue.Source,Amount,Percent,Fund.Type`.
    pub fn save_receipts<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Record>,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("new_revenues.csv");
        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(RECEIPTS_HEADER)?;

        let mut count = 0;
        for record in records {
            writer.write_record([
                record.label.clone(),
                record.amount.to_string(),
                optional_cell(record.percent),
                record.category.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }
        writer.flush()?;

        tracing::info!("Saved {} receipts to {}", count, file_path.display());
        Ok(file_path)
    }

    /// Writes available balances as `Revenue.Source,Available.Balance,Percent`.
    pub fn save_balances(&self, records: &[Record]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("available_balances.csv");
        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(BALANCES_HEADER)?;

        for record in records {
            writer.write_record([
                record.label.clone(),
                record.amount.to_string(),
                optional_cell(record.percent),
            ])?;
        }
        writer.flush()?;

        tracing::info!("Saved {} balances to {}", records.len(), file_path.display());
        Ok(file_path)
    }

    /// Saves the skipped-row manifest in JSON format
    pub fn save_manifest(
        &self,
        source: &Path,
        output: &PipelineOutput,
        reconciliation: Option<&Reconciliation>,
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("manifest.json");

        let section_counts: serde_json::Map<String, serde_json::Value> = output
            .sections
            .iter()
            .map(|s| (s.name.clone(), serde_json::json!(s.records.len())))
            .collect();

        let mut manifest = serde_json::json!({
            "source": source.display().to_string(),
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
            "record_counts": section_counts,
            "skipped_rows": output.manifest.skipped_rows,
            "absent_sections": output.manifest.absent_sections,
        });
        if let Some(reconciliation) = reconciliation {
            manifest["reconciliation"] = serde_json::json!({
                "rows": reconciliation.rows.len(),
                "unmatched_balances": reconciliation.unmatched_balances,
                "uncategorized_receipts": reconciliation.uncategorized_receipts,
                "replaced_history_rows": reconciliation.replaced_history_rows,
                "incomplete_history_rows": reconciliation.incomplete_history_rows,
                "duplicate_rows": reconciliation.duplicate_rows,
            });
        }

        let manifest_str = serde_json::to_string_pretty(&manifest)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, manifest_str)?;

        tracing::info!("Saved manifest to {}", file_path.display());
        Ok(file_path)
    }

    /// Keeps a copy of the published rows before anything is merged into them.
    pub fn backup_history(&self, rows: &[HistoricalRevenue]) -> Result<PathBuf, StorageError> {
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
        let file_path = self.base_dir.join(format!("old_revenues_{}.csv", timestamp));
        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(HISTORY_HEADER)?;

        for row in rows {
            writer.write_record([
                row.revenue_source.as_deref().unwrap_or_default(),
                row.amount.as_deref().unwrap_or_default(),
                row.fund_type.as_deref().unwrap_or_default(),
                row.fiscal_year.as_deref().unwrap_or_default(),
                row.fiscal_year_2.as_deref().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;

        tracing::info!("Backed up {} published rows to {}", rows.len(), file_path.display());
        Ok(file_path)
    }

    /// Writes the reconciled dataset.
    pub fn save_final(&self, rows: &[RevenueRow]) -> Result<PathBuf, StorageError> {
        let file_path = self.base_dir.join("final_revenues.csv");
        let mut writer = csv::Writer::from_path(&file_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!("Saved {} reconciled rows to {}", rows.len(), file_path.display());
        Ok(file_path)
    }
}

fn optional_cell(value: Option<rust_decimal::Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

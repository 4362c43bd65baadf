// src/main.rs
mod config;
mod document;
mod extractors;
mod reconcile;
mod socrata;
mod storage;
mod utils;

use std::path::PathBuf;

use clap::Parser;

use config::{DocumentEdition, EditionConfig, FiscalPeriod, SectionKind};
use document::Document;
use extractors::{Pipeline, PipelineOutput};
use reconcile::Reconciler;
use socrata::client;
use socrata::models::{DatasetLocation, HistoricalRevenue};
use storage::StorageManager;
use utils::AppError;

/// Command Line Interface for the budget exhibit revenue extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Budget exhibit to parse (.pdf, or .txt with form feeds between pages)
    #[arg(short, long)]
    input: PathBuf,

    /// Document edition: adopted or proposed
    #[arg(short, long, default_value = "adopted", conflicts_with = "config")]
    edition: String,

    /// JSON edition table replacing the built-in one (cannot be combined with --edition)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for CSV files and the manifest
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Debug mode - save annotated text and normalized sections
    #[arg(short, long)]
    debug: bool,

    /// Fiscal year of the exhibit, e.g. 2021-2022. Enables reconciliation.
    #[arg(long)]
    fiscal_year: Option<String>,

    /// Saved SODA JSON export of the published dataset (optional)
    #[arg(long, conflicts_with = "fetch_history")]
    history: Option<PathBuf>,

    /// Download the published dataset instead of reading --history
    #[arg(long)]
    fetch_history: bool,

    /// Open-data portal domain
    #[arg(long, default_value = "data.lacity.org")]
    dataset_domain: String,

    /// Dataset identifier on the portal
    #[arg(long, default_value = "ih6g-qkwz")]
    dataset_id: String,

    /// Maximum number of published rows to request
    #[arg(long, default_value_t = client::DEFAULT_ROW_LIMIT)]
    row_limit: usize,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Resolve the edition table before touching the document
    let edition_config = match &args.config {
        Some(path) => EditionConfig::load(path)?,
        None => {
            let edition: DocumentEdition = args.edition.parse()?;
            edition.config()
        }
    };
    let fiscal_period = args
        .fiscal_year
        .as_deref()
        .map(str::parse::<FiscalPeriod>)
        .transpose()?;
    tracing::info!(
        "Using {} edition with {} sections",
        edition_config.edition,
        edition_config.sections.len()
    );

    // 4. Initialize storage and load the document
    let storage = StorageManager::new(&args.output_dir)?;
    let document = Document::load(&args.input)?;

    // 5. Run the extraction pipeline
    let pipeline = Pipeline::new(edition_config)?;
    if args.debug {
        write_anchor_debug(&pipeline, &document, &storage)?;
    }
    let output = pipeline.run(&document)?;
    if args.debug {
        write_section_debug(&output, &storage)?;
    }

    // 6. Save parsed records
    let receipts: Vec<_> = output.records_of_kind(SectionKind::Receipts).cloned().collect();
    let balances: Vec<_> = output.records_of_kind(SectionKind::Balances).cloned().collect();
    storage.save_receipts(&receipts)?;
    if output.sections.iter().any(|s| s.kind == SectionKind::Balances) {
        storage.save_balances(&balances)?;
    }

    // 7. Reconcile with the published dataset when a fiscal year is given
    let reconciliation = match fiscal_period {
        Some(period) => {
            let history = load_history(&args).await?;
            if !history.is_empty() {
                storage.backup_history(&history)?;
            }
            let result = Reconciler::new(period).reconcile(&receipts, &balances, &history);
            storage.save_final(&result.rows)?;
            Some(result)
        }
        None => {
            if args.history.is_some() || args.fetch_history {
                tracing::warn!("History given without --fiscal-year; skipping reconciliation");
            }
            None
        }
    };

    // 8. Save the manifest for review
    storage.save_manifest(&args.input, &output, reconciliation.as_ref())?;

    if !output.manifest.skipped_rows.is_empty() {
        tracing::warn!(
            "{} rows were skipped; review manifest.json before publishing",
            output.manifest.skipped_rows.len()
        );
    }
    tracing::info!(
        "Processing finished. Records: {}, Skipped rows: {}, Absent sections: {:?}",
        output.record_count(),
        output.manifest.skipped_rows.len(),
        output.manifest.absent_sections
    );

    Ok(())
}

async fn load_history(args: &Args) -> Result<Vec<HistoricalRevenue>, AppError> {
    if let Some(path) = &args.history {
        return Ok(client::load_history_snapshot(path).await?);
    }
    if args.fetch_history {
        let location = DatasetLocation {
            domain: args.dataset_domain.clone(),
            dataset_id: args.dataset_id.clone(),
        };
        return Ok(client::fetch_history(&location, args.row_limit).await?);
    }
    tracing::info!("No published history supplied; final dataset holds the new fiscal year only");
    Ok(Vec::new())
}

/// Writes the stripped document text with every configured anchor marked.
fn write_anchor_debug(pipeline: &Pipeline, document: &Document, storage: &StorageManager) -> Result<(), AppError> {
    let debug_dir = storage.base_dir().join("debug");
    std::fs::create_dir_all(&debug_dir)?;

    let normalizer = pipeline.normalizer();
    let stripped = normalizer.strip_structural(&document.raw_text());
    let owned: Vec<(String, &str)> = pipeline
        .config()
        .sections
        .iter()
        .flat_map(|s| {
            [
                (normalizer.strip_structural(&s.start_anchor), "start"),
                (normalizer.strip_structural(&s.end_anchor), "end"),
            ]
        })
        .collect();
    let anchors: Vec<(&str, &str)> = owned.iter().map(|(a, kind)| (a.as_str(), *kind)).collect();
    utils::text_debug::create_debug_text(&stripped, &debug_dir.join("document_annotated.txt"), &anchors)
}

/// Writes each section's normalized text with row and field markers made visible.
fn write_section_debug(output: &PipelineOutput, storage: &StorageManager) -> Result<(), AppError> {
    let debug_dir = storage.base_dir().join("debug");
    std::fs::create_dir_all(&debug_dir)?;

    for section in &output.sections {
        let path = debug_dir.join(format!("{}_normalized.txt", section.name));
        std::fs::write(&path, utils::text_debug::render_markers(&section.normalized))?;
        tracing::info!("Saved normalized section '{}' to {}", section.name, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_conflicts_with_explicit_edition() {
        let both = Args::try_parse_from([
            "budget_extractor",
            "--input",
            "exhibit.txt",
            "--edition",
            "proposed",
            "--config",
            "edition.json",
        ]);
        assert!(both.is_err());

        let config_only =
            Args::try_parse_from(["budget_extractor", "--input", "exhibit.txt", "--config", "edition.json"]).unwrap();
        assert_eq!(config_only.edition, "adopted");
        assert!(config_only.config.is_some());
    }
}

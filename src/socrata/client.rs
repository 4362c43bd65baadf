// src/socrata/client.rs
use std::path::Path;

use reqwest::header;

use crate::socrata::models::{DatasetLocation, HistoricalRevenue};
use crate::utils::error::DatasetError;

const USER_AGENT: &str = concat!("budget_extractor/", env!("CARGO_PKG_VERSION"));
/// SODA pages default to 1000 rows; ask for the whole dataset in one go.
pub const DEFAULT_ROW_LIMIT: usize = 100_000;

/// Creates a reqwest client configured for the open-data portal.
fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
}

/// Downloads the currently published revenue rows. Reads need no credentials.
pub async fn fetch_history(location: &DatasetLocation, limit: usize) -> Result<Vec<HistoricalRevenue>, DatasetError> {
    let client = build_client()?;
    let url = location.resource_url(limit);

    tracing::info!("Fetching published dataset from: {}", url);

    let response = client
        .get(&url)
        .header(header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DatasetError::DatasetNotFound(location.dataset_id.clone()));
        }
        return Err(DatasetError::Http(status));
    }

    let body = response.text().await?;
    let rows = parse_history(&body)?;
    tracing::info!("Fetched {} historical rows", rows.len());
    if rows.len() >= limit {
        tracing::warn!("Row limit {} reached; the history may be truncated", limit);
    }
    Ok(rows)
}

/// Reads a previously saved SODA JSON export instead of calling the portal.
pub async fn load_history_snapshot<P: AsRef<Path>>(path: P) -> Result<Vec<HistoricalRevenue>, DatasetError> {
    let path = path.as_ref();
    tracing::info!("Loading history snapshot from {}", path.display());
    let body = tokio::fs::read_to_string(path).await?;
    parse_history(&body)
}

fn parse_history(body: &str) -> Result<Vec<HistoricalRevenue>, DatasetError> {
    serde_json::from_str(body).map_err(|e| DatasetError::Parse(e.to_string()))
}

// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Could not read history snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset response: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Section not found: {section} (anchors {start_anchor:?} .. {end_anchor:?})")]
    SectionNotFound {
        section: String,
        start_anchor: String,
        end_anchor: String,
    },

    #[error("Malformed row: {reason} ({raw_token:?})")]
    MalformedRow { reason: String, raw_token: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown document edition: {0}")]
    UnknownEdition(String),

    #[error("Invalid edition configuration: {0}")]
    Invalid(String),

    #[error("Invalid fiscal year {0:?}, expected the form 2021-2022")]
    FiscalYear(String),

    #[error("Could not read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Document loading failed: {0}")]
    Document(#[from] DocumentError),

    #[error("Dataset interaction failed: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

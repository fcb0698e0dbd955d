use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the portfolio crates.
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader or writer rejected the input.
    #[error("Failed to process CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A column the pipeline depends on is absent from the uploaded data.
    #[error("Missing expected column: {0}")]
    MissingColumn(String),

    /// No header ends with the configured date suffix.
    #[error("No date column found (expected a header ending with \"{0}\")")]
    NoDateColumn(String),

    /// A date string did not match any recognised format.
    #[error("Invalid date format: {0}")]
    DateParse(String),

    /// Text could not be extracted from an uploaded document.
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the portfolio crates.
pub type Result<T> = std::result::Result<T, PortfolioError>;

// src/errors.rs
use thiserror::Error;

/// Errors that stop a validation run before any test outcome exists.
///
/// Anything that goes wrong while a test talks to NodeNorm or NameRes is
/// reported as a failed `TestResult` instead.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download of {url} failed with status {status}")]
    Download { url: String, status: u16 },

    #[error("Unsupported sheet format for '{0}' (expected .csv or .json)")]
    UnsupportedSheet(String),

    #[error("Could not read BabelTests from issue: {0}")]
    IssueSyntax(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

//! Error types for Framefind.

use thiserror::Error;

/// Library-level error type for Framefind operations.
#[derive(Error, Debug)]
pub enum FramefindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Text encoder failed: {0}")]
    Encoder(String),

    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    #[error("Transcript search failed: {0}")]
    TextSearch(String),

    #[error("Ingestion failed: {0}")]
    Ingest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Framefind operations.
pub type Result<T> = std::result::Result<T, FramefindError>;

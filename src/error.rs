//! Error types for Pugg.

use thiserror::Error;

/// Library-level error type for Pugg operations.
#[derive(Error, Debug)]
pub enum PuggError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Result type alias for Pugg operations.
pub type Result<T> = std::result::Result<T, PuggError>;

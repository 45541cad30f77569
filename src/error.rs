//! Error types for Coursemate.

use thiserror::Error;

/// Library-level error type for Coursemate operations.
#[derive(Error, Debug)]
pub enum CourseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Course store error: {0}")]
    Store(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Course ingestion failed: {0}")]
    Ingest(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Coursemate operations.
pub type Result<T> = std::result::Result<T, CourseError>;

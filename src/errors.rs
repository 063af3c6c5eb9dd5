// ABOUTME: Error types for the decksmith application
// ABOUTME: Provides structured error handling for each stage of the pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Failed to decode API response: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{operation} failed with status {status}: {message}")]
    ApiError {
        operation: &'static str,
        status: u16,
        message: String,
    },

    #[error("Authorization error: {0}")]
    AuthError(String),

    #[error("Missing required placeholders: {}", .0.join(", "))]
    MissingPlaceholders(Vec<String>),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Thumbnail download error: {0}")]
    DownloadError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

// Implement conversion from anyhow::Error to our DeckError
impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::UnknownError(err.to_string())
    }
}

// Implement conversion from zip errors
impl From<zip::result::ZipError> for DeckError {
    fn from(err: zip::result::ZipError) -> Self {
        DeckError::ArchiveError(format!("ZIP operation failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;

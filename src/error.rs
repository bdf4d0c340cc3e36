use crate::chunking::ChunkingError;
use crate::embedding::{EmbeddingError, VectorIndexError};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for docctx
#[derive(Error, Debug)]
pub enum DocctxError {
    /// Uploaded file has an extension the extractor does not handle
    #[error("Unsupported file type: {file_name}")]
    UnsupportedFileType { file_name: String },

    /// Embedding failures are fatal: no index is built and no query is answered
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index errors
    #[error("Vector index error: {0}")]
    Index(#[from] VectorIndexError),

    /// Chunker construction errors
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Web search provider errors
    #[error("Web search error: {0}")]
    WebSearch(String),

    /// A blocking worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for docctx operations
pub type Result<T> = std::result::Result<T, DocctxError>;

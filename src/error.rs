//! Error types for the mapping compiler
//!
//! Compilation itself never fails. These errors cover the fallible edges
//! around it: reading documents, parsing JSON and loading configuration.

use thiserror::Error;

/// Result type for mapper operations
pub type Result<T> = std::result::Result<T, MapperError>;

/// Mapper errors
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid mapping document: {0}")]
    InvalidDocument(String),

    #[error("Invalid template: {0}")]
    Template(#[from] crate::template::TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

//! # Model Errors
//!
//! Error types for constructing paths, keys and documents.

use thiserror::Error;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Model construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Field path is empty or has an empty segment
    #[error("Invalid field path: {0}")]
    InvalidFieldPath(String),

    /// Document keys need an even, non-zero number of segments
    #[error("Invalid document key '{0}': path must have an even number of segments")]
    InvalidDocumentKey(String),

    /// Document body must be a JSON object
    #[error("Invalid document body: {0}")]
    InvalidDocument(String),
}

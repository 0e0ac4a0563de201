//! Error types for OpenAPI documents.

use thiserror::Error;

/// Errors that can occur while assembling a document.
#[derive(Debug, Error)]
pub enum OpenApiError {
    /// Same schema name registered with two different definitions.
    #[error("schema conflict for '{name}': registered with two different definitions")]
    SchemaConflict { name: String },

    /// Two operations claim the same method and path.
    #[error("duplicate operation {method} {path}")]
    DuplicateOperation { method: String, path: String },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

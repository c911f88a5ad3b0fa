//! Error types for `mcpifier-rest-tools`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestToolsError {
    /// Invalid mapping or executor configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A raw schema that the JSON Schema engine refuses to compile.
    #[error("schema error: {0}")]
    Schema(String),

    /// An instance that does not conform to its schema. Carries every violation, `; `-joined.
    #[error("{0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RestToolsError>;

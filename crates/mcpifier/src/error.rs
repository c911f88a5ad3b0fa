//! Error types for the mcpifier server.

use thiserror::Error;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum McpifierError {
    /// Configuration errors (invalid JSON/YAML, missing fields, conflicts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (listener failed to bind, ...)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Tool mapping / REST engine errors
    #[error(transparent)]
    Rest(#[from] mcpifier_rest_tools::RestToolsError),

    /// `OpenAPI` conversion errors
    #[error(transparent)]
    OpenApi(#[from] mcpifier_openapi_tools::OpenApiToolsError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, McpifierError>;

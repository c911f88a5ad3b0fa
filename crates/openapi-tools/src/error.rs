//! Error types for `mcpifier-openapi-tools`.

use thiserror::Error;

/// Main error type for `OpenAPI` conversion.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Structural problems with the document (unsupported constructs, bad method, ...).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// A `$ref` that cannot be followed.
    #[error("OpenAPI error: unresolved reference '{reference}': {message}")]
    Reference { reference: String, message: String },

    #[error("OpenAPI error: failed to fetch spec from '{url}': {message}")]
    SpecFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read spec file '{path}': {source}")]
    SpecReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse OpenAPI spec from '{location}': {source}")]
    SpecParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for `OpenAPI` conversion.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;

//! Error types for `pipeline-api`.

use thiserror::Error;

/// Main error type for the registry and its transports.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Configuration errors (invalid config, missing fields, bad names).
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration error: failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Startup errors (transport failed to bind to the registry).
    #[error("Startup error: {0}")]
    Startup(String),

    /// A resource name, route or component is already registered.
    #[error("Name collision: {0}")]
    NameCollision(String),

    /// A pipeline schema cannot be compiled or published in the `OpenAPI` document.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Errors raised by a transport that do not fit the other variants.
    #[error("Transport error ({transport}): {message}")]
    Transport { transport: String, message: String },

    /// JSON errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, ApiError>;

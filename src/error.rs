//! Error types for the schema compiler

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Hard compilation failures.
///
/// Most problems met while compiling a type graph are advisory and end up in
/// [`crate::diagnostics::Diagnostics`]; only the variants below abort a pass.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Found 2 schemas with same name \"{name}\" for types {existing} and {incoming}")]
    DuplicateSchemaName {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("Invalid type reference '{input}': {reason}")]
    InvalidTypeRef { input: String, reason: String },

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

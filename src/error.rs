//! Error types for the consistency engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while reading a schema document or loading configuration.
///
/// The text-level operations (`validate`, `report`, `repair`, `dedupe`)
/// never surface these directly; they fold them into a diagnostic value.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Document root must be a mapping with classes, slots and enums")]
    NotAMapping,

    #[error("Section '{section}' must be a mapping, found {found}")]
    InvalidSection { section: String, found: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

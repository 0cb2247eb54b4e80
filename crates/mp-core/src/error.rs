//! Error types for monophoton

use thiserror::Error;

/// monophoton error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Configuration is unset or malformed. Detected before any event is processed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A required per-event value is absent.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A source record could not be decoded into an event.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Per-event anomalies never abort a run; everything else does.
    pub fn is_per_event(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::MalformedRecord(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

//! Error types and handling.

use thiserror::Error;

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Data parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report export error
    #[error("Export error: {0}")]
    Export(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Host script call failed
    #[error("Host error: {0}")]
    Host(String),

    /// No host is attached (browser-only mode)
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    /// A fetch or export is already outstanding
    #[error("Another request is already in progress")]
    RequestInFlight,

    /// Completion arrived for a request nobody is waiting on
    #[error("No pending host request with id {0}")]
    UnknownCorrelation(uuid::Uuid),

    /// Unknown or unusable time zone
    #[error("Timezone error: {0}")]
    Timezone(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create a parse error with message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an export error with message
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a host error with message
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

//! Error types for Tollgate.
//!
//! A denied admission is not an error. These variants only cover
//! construction and configuration failures.

use thiserror::Error;

/// Main error type for Tollgate operations.
#[derive(Error, Debug)]
pub enum TollgateError {
    /// Quota parameters that can never admit or never reset
    #[error("Invalid quota: {0}")]
    InvalidQuota(String),

    /// Two policy dimensions would share accounting on the same tracker
    #[error("Namespace collision: both dimensions use '{0}' on the same tracker")]
    NamespaceCollision(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for TollgateError {
    fn from(err: ::config::ConfigError) -> Self {
        TollgateError::Config(err.to_string())
    }
}

/// Result type alias for Tollgate operations.
pub type Result<T> = std::result::Result<T, TollgateError>;

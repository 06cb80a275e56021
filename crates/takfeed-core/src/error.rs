//! Error types for the takfeed event generator.
//!
//! Errors are grouped by where they come from: the configuration or the input
//! records fed to the converters. Transport failures stay inside the client
//! crate, which reports them through `anyhow`.

use thiserror::Error;

/// Result type alias using TakFeedError as the error type.
pub type Result<T> = std::result::Result<T, TakFeedError>;

/// Top-level error type for takfeed operations.
#[derive(Debug, Error)]
pub enum TakFeedError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input record errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Errors related to configuration.
///
/// These errors occur when loading, parsing, or validating configuration files.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field, when the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::MissingField { field } | ConfigError::InvalidValue { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

/// Errors related to the record files fed to the converters.
///
/// Individual missing fields are never errors; these cover documents that
/// cannot be read or are not the expected shape at all.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    /// Input file not found
    #[error("Input file not found: {path}")]
    FileNotFound { path: String },

    /// Input file could not be read
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    /// Document is not valid JSON or not the expected shape
    #[error("JSON parse error at line {line}, column {column}: {message}")]
    JsonError {
        line: usize,
        column: usize,
        message: String,
    },
}

impl InputError {
    /// Creates a JSON parse error.
    pub fn json(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::JsonError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Creates a read failure for the given path.
    pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

//! Error types for droidenv
//!
//! Centralized error handling using thiserror. Every variant is fatal: the
//! binary prints it and exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for input resolution
#[derive(Error, Debug)]
pub enum DroidEnvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Missing environment: {0}")]
    MissingVariable(String),

    #[error("Unsupported ABI: {0}")]
    UnsupportedAbi(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },

    #[error("Not found: {}={}", .name, .path.display())]
    PathNotFound { name: String, path: PathBuf },
}

/// Result type alias for droidenv operations
pub type Result<T> = std::result::Result<T, DroidEnvError>;

impl DroidEnvError {
    pub(crate) fn path_not_found(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        DroidEnvError::PathNotFound {
            name: name.into(),
            path: path.into(),
        }
    }

    pub(crate) fn invalid_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        DroidEnvError::InvalidValue {
            name: name.into(),
            value: value.into(),
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for configuration loading and validation.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors produced while loading, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// The field that failed.
        field: String,
        /// Why it failed.
        message: String,
    },

    /// A required field is absent.
    #[error("missing required field '{field}'")]
    MissingField {
        /// The absent field.
        field: String,
    },

    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Reading the configuration file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Parsing the configuration file failed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path being parsed.
        path: PathBuf,
        /// Parser error detail.
        message: String,
    },

    /// Serialization or deserialization failed outside a file context.
    #[error("serialization error: {message}")]
    Serialization {
        /// Serializer error detail.
        message: String,
    },

    /// The file extension does not map to a supported format.
    #[error("unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The offending extension.
        format: String,
    },

    /// An environment variable override carried an unusable value.
    #[error("invalid environment variable {name}: {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// What was wrong with the value.
        message: String,
    },
}

impl ConfigError {
    /// Build a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Build a file-not-found error.
    pub fn file_not_found(path: impl AsRef<Path>) -> Self {
        Self::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Build an I/O error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Build a parse error.
    pub fn parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Build a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Build an unsupported-format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Build an invalid-environment-variable error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Stable discriminant used in structured logs and tests.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::MissingField { .. } => "missing_field",
            Self::FileNotFound { .. } => "file_not_found",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Serialization { .. } => "serialization",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::InvalidEnvVar { .. } => "invalid_env_var",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

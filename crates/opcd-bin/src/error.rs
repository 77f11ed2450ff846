// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Top-level application errors.

use thiserror::Error;

/// Result alias for application-level operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the binary's commands.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] opcd_config::ConfigError),

    /// The driver reported an error.
    #[error(transparent)]
    Driver(#[from] opcd_sdk::DriverError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcd-config
//!
//! Custom configuration for the opcd OPC-UA device service.
//!
//! This crate owns the driver's configuration surface:
//!
//! - **Schema**: [`ServiceConfig`] and its nested OPC-UA block with the
//!   fixed security policy/mode tables and endpoint lookup
//! - **Convert**: translation of raw readings into host command values
//! - **Loader**: file loading (TOML/YAML/JSON), environment overrides,
//!   and the modification-time watcher driving live writable updates
//! - **Error**: the [`ConfigError`] hierarchy

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod convert;
pub mod error;
pub mod loader;
pub mod schema;

pub use convert::new_result;
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigFormat, ConfigLoader, ConfigWatcher};
pub use schema::{
    fetch_endpoint, OpcuaConfig, OpcuaWritable, ServiceConfig, ENDPOINT_PROPERTY, PROTOCOL_NAME,
    SECURITY_MODES, SECURITY_POLICIES,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

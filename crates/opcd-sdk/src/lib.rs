// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcd-sdk
//!
//! Host device-service framework contract for opcd.
//!
//! This crate defines the types a protocol driver exchanges with the host
//! runtime and the plugin trait the runtime invokes:
//!
//! - **Types**: `Value`, `ValueType`, `CommandRequest`, `CommandValue`,
//!   protocol property maps and registry payloads
//! - **Driver**: the [`ProtocolDriver`] trait and its [`InitContext`]
//! - **Error**: [`DriverError`] kinds plus the partial-batch
//!   [`ReadBatchError`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use opcd_sdk::{CommandRequest, ProtocolDriver, ValueType};
//!
//! let request = CommandRequest::new("Temperature", ValueType::Float32)
//!     .with_attribute("nodeId", serde_json::json!("ns=2;s=Temp"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod driver;
pub mod error;
pub mod types;

pub use driver::{InitContext, ProtocolDriver};
pub use error::{DriverError, DriverResult, ReadBatchError};
pub use types::{
    AdminState, AsyncValues, CommandRequest, CommandValue, DiscoveredDevice, ProtocolProperties,
    Value, ValueType,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

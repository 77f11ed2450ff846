// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcd-driver
//!
//! OPC-UA protocol driver for the opcd device service.
//!
//! The driver implements the host plugin interface from `opcd-sdk`:
//!
//! - **Node**: node identifier parsing (`ns=2;i=1001` and friends)
//! - **Session**: the session trait seam plus the real client implementation
//! - **Driver**: [`OpcUaDriver`], the plugin itself
//!
//! Each read batch opens a fresh session against the device endpoint and
//! closes it before returning; the driver holds no connection state between
//! batches.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod driver;
pub mod node;
pub mod session;

pub use client::{RealSession, RealSessionFactory};
pub use driver::{OpcUaDeviceDriver, OpcUaDriver};
pub use node::{NodeId, NodeIdentifier};
pub use session::{NodeReading, OpcUaSession, SessionFactory, StatusInfo};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

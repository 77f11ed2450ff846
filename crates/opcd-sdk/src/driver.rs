// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The plugin interface every protocol driver implements.
//!
//! The host runtime owns the device registry, the read scheduler, and the
//! configuration provider; a driver only reacts to the calls below. The
//! call sequence is fixed: [`ProtocolDriver::initialize`] exactly once at
//! startup, then any number of command and lifecycle callbacks, then
//! [`ProtocolDriver::stop`] at shutdown.
//!
//! ```text
//!   host runtime ──► initialize (once)
//!                ──► handle_read_commands / handle_write_commands (scheduled)
//!                ──► add/update/remove_device, discover (registry events)
//!                ──► stop (shutdown, may arrive before initialize finishes)
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{DriverResult, ReadBatchError};
use crate::types::{
    AdminState, AsyncValues, CommandRequest, CommandValue, DiscoveredDevice, ProtocolProperties,
};

// =============================================================================
// InitContext
// =============================================================================

/// Everything the host hands a driver at initialization time.
#[derive(Debug)]
pub struct InitContext {
    /// Name the service is registered under.
    pub service_name: String,
    /// Path to the service configuration file holding the driver's custom
    /// section.
    pub config_path: PathBuf,
    /// Channel for asynchronously produced readings.
    pub async_values: mpsc::Sender<AsyncValues>,
    /// Channel for devices found during discovery.
    pub discovered_devices: mpsc::Sender<Vec<DiscoveredDevice>>,
}

// =============================================================================
// ProtocolDriver
// =============================================================================

/// Contract between the host runtime and a protocol driver.
///
/// All methods are invoked by the host; a driver never calls them itself.
/// Implementations must be safe to share across the host's worker tasks.
#[async_trait]
pub trait ProtocolDriver: Send + Sync {
    /// Called once at startup before any other method.
    ///
    /// The driver loads and validates its custom configuration here and
    /// registers any change watchers. A returned error aborts service
    /// startup.
    async fn initialize(&mut self, ctx: InitContext) -> DriverResult<()>;

    /// Execute a batch of scheduled read requests against one device.
    ///
    /// On failure the error carries the results converted before the
    /// failing request; requests after it were not attempted.
    async fn handle_read_commands(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, ReadBatchError>;

    /// Execute a batch of write requests against one device.
    async fn handle_write_commands(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        requests: &[CommandRequest],
        params: &[CommandValue],
    ) -> DriverResult<()>;

    /// Called when the service shuts down.
    ///
    /// Must tolerate being invoked before `initialize` has completed.
    async fn stop(&self, force: bool) -> DriverResult<()>;

    /// A device using this protocol was added to the registry.
    async fn add_device(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        admin_state: AdminState,
    ) -> DriverResult<()>;

    /// A device using this protocol was updated in the registry.
    async fn update_device(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        admin_state: AdminState,
    ) -> DriverResult<()>;

    /// A device using this protocol was removed from the registry.
    async fn remove_device(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
    ) -> DriverResult<()>;

    /// Trigger protocol-level device discovery.
    async fn discover(&self) -> DriverResult<()>;
}

// =============================================================================
// Tests
// =============================================================================

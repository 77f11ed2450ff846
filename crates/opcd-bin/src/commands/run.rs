// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `run` command: start the device service.
//!
//! The bootstrap here plays the host runtime's part: it hands the driver
//! its initialization context, drains the asynchronous channels, and calls
//! `stop` on shutdown. Command scheduling itself is owned by the device
//! management framework this service registers with.

use tokio::sync::mpsc;
use tracing::{debug, info};

use opcd_driver::OpcUaDeviceDriver;
use opcd_sdk::{InitContext, ProtocolDriver};

use crate::cli::{Cli, RunArgs};
use crate::error::AppResult;

/// Channel capacity for asynchronous readings and discovery results.
const CHANNEL_CAPACITY: usize = 64;

/// Start the service and block until shutdown.
pub async fn execute(cli: &Cli, args: &RunArgs) -> AppResult<()> {
    info!(
        service = %args.service_name,
        config = %cli.config.display(),
        "Starting OPC-UA device service"
    );

    let (async_tx, mut async_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (disc_tx, mut disc_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // Drain the driver-facing channels the way the host runtime would.
    let drain = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(values) = async_rx.recv() => {
                    let values: opcd_sdk::AsyncValues = values;
                    debug!(
                        device = %values.device_name,
                        count = values.values.len(),
                        "Received asynchronous readings"
                    );
                }
                Some(devices) = disc_rx.recv() => {
                    let devices: Vec<opcd_sdk::DiscoveredDevice> = devices;
                    debug!(count = devices.len(), "Received discovered devices");
                }
                else => break,
            }
        }
    });

    let mut driver = OpcUaDeviceDriver::new_real();
    driver
        .initialize(InitContext {
            service_name: args.service_name.clone(),
            config_path: cli.config.clone(),
            async_values: async_tx,
            discovered_devices: disc_tx,
        })
        .await?;

    info!("Service started, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    driver.stop(false).await?;
    drain.abort();

    info!("Service stopped");
    Ok(())
}

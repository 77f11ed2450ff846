// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The OPC-UA protocol driver.
//!
//! Implements the host plugin interface: configuration loading and the
//! writable-section watch at initialization, one fresh session per read
//! batch, and log-only device lifecycle callbacks. Write commands and
//! discovery are not supported.
//!
//! ```text
//!   initialize ──► load + validate config ──► spawn writable watch
//!   handle_read_commands ──► fetch endpoint ──► connect
//!       ──► per request: nodeId attr ─► parse ─► read ─► convert
//!       ──► disconnect (all exit paths)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use opcd_config::{fetch_endpoint, new_result, ConfigLoader, ConfigWatcher, OpcuaWritable};
use opcd_sdk::{
    AdminState, CommandRequest, CommandValue, DriverError, DriverResult, InitContext,
    ProtocolDriver, ProtocolProperties, ReadBatchError,
};

use crate::client::RealSessionFactory;
use crate::node::NodeId;
use crate::session::{OpcUaSession, SessionFactory};

// =============================================================================
// Constants
// =============================================================================

/// Resource attribute carrying the target node id.
const NODE_ID_ATTRIBUTE: &str = "nodeId";

/// Staleness tolerance handed to the server on every read, in milliseconds.
const MAX_AGE_MS: f64 = 2000.0;

/// Poll interval of the writable-section watch.
const WRITABLE_POLL_INTERVAL: Duration = Duration::from_secs(10);

// =============================================================================
// OpcUaDriver
// =============================================================================

/// The OPC-UA device-service driver, generic over its session factory so
/// tests can substitute a mock.
pub struct OpcUaDriver<F: SessionFactory> {
    factory: F,
    state: Option<DriverState>,
}

/// State established by a successful `initialize`.
///
/// The writable section lives only in the `Arc<RwLock>`; the watch task
/// updates it in place, so no second copy is kept here.
struct DriverState {
    service_name: String,
    device_name: String,
    writable: Arc<RwLock<OpcuaWritable>>,
    watch_handle: tokio::task::JoinHandle<()>,
    // Held so the host's channels stay open for the service lifetime.
    #[allow(dead_code)]
    ctx_channels: (
        tokio::sync::mpsc::Sender<opcd_sdk::AsyncValues>,
        tokio::sync::mpsc::Sender<Vec<opcd_sdk::DiscoveredDevice>>,
    ),
}

/// Driver wired to the real OPC-UA client.
pub type OpcUaDeviceDriver = OpcUaDriver<RealSessionFactory>;

impl OpcUaDeviceDriver {
    /// Create a driver backed by the real client library.
    pub fn new_real() -> Self {
        Self::new(RealSessionFactory::new())
    }
}

impl<F: SessionFactory> OpcUaDriver<F> {
    /// Create a driver over the given session factory.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: None,
        }
    }

    /// Current writable configuration snapshot, if initialized.
    pub fn writable(&self) -> Option<OpcuaWritable> {
        self.state.as_ref().map(|s| s.writable.read().clone())
    }

    /// Apply a writable-section update delivered by the watch.
    ///
    /// Unchanged values are logged and discarded; changed values replace
    /// the held configuration under the write lock, safe against an
    /// in-flight read batch consulting it.
    fn process_custom_config_changes(writable: &RwLock<OpcuaWritable>, new: OpcuaWritable) {
        let unchanged = *writable.read() == new;
        if unchanged {
            debug!("No changes detected in writable configuration");
            return;
        }

        info!(resources = %new.resources, "Writable configuration changed");
        *writable.write() = new;
    }

    /// Translate one read request into a typed command value.
    async fn handle_read_command_request(
        &self,
        session: &F::Session,
        request: &CommandRequest,
    ) -> DriverResult<CommandValue> {
        let node_attr = request.attributes.get(NODE_ID_ATTRIBUTE).ok_or_else(|| {
            DriverError::contract_invalid(format!(
                "attribute {NODE_ID_ATTRIBUTE} does not exist for resource '{}'",
                request.device_resource_name
            ))
        })?;
        let node_str = node_attr.as_str().ok_or_else(|| {
            DriverError::contract_invalid(format!(
                "attribute {NODE_ID_ATTRIBUTE} of resource '{}' is not a string",
                request.device_resource_name
            ))
        })?;

        let node: NodeId = node_str.parse()?;

        let reading = session.read_node(&node, MAX_AGE_MS).await?;

        if !reading.status.is_good() {
            return Err(DriverError::read_status(node.to_string(), reading.status.name));
        }

        new_result(request, reading.value)
    }
}

// =============================================================================
// ProtocolDriver Implementation
// =============================================================================

#[async_trait]
impl<F: SessionFactory + 'static> ProtocolDriver for OpcUaDriver<F> {
    async fn initialize(&mut self, ctx: InitContext) -> DriverResult<()> {
        // A repeated initialize replaces the state wholesale; stop the
        // previous watch task so it does not keep polling the old file.
        if let Some(previous) = self.state.take() {
            warn!(service = %previous.service_name, "Reinitializing driver");
            previous.watch_handle.abort();
        }

        let loader = ConfigLoader::new();
        let service_config = loader
            .load(&ctx.config_path)
            .map_err(|e| DriverError::contract_invalid(e.to_string()))?;

        let writable = Arc::new(RwLock::new(service_config.opcua.writable.clone()));

        // Watch the configuration file for writable-section updates. The
        // callback runs on this task, concurrently with read batches.
        let mut watcher = ConfigWatcher::new(ctx.config_path.clone(), loader);
        let watched = Arc::clone(&writable);
        let watch_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(WRITABLE_POLL_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match watcher.reload_if_changed() {
                    Ok(Some(updated)) => {
                        Self::process_custom_config_changes(&watched, updated.opcua.writable);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed configuration update");
                    }
                }
            }
        });

        info!(
            service = %ctx.service_name,
            device_name = %service_config.opcua.device_name,
            policy = %service_config.opcua.policy,
            mode = %service_config.opcua.mode,
            "Driver initialized"
        );

        self.state = Some(DriverState {
            service_name: ctx.service_name,
            device_name: service_config.opcua.device_name,
            writable,
            watch_handle,
            ctx_channels: (ctx.async_values, ctx.discovered_devices),
        });

        Ok(())
    }

    async fn handle_read_commands(
        &self,
        device_name: &str,
        protocols: &ProtocolProperties,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandValue>, ReadBatchError> {
        debug!(device = %device_name, count = requests.len(), "Handling read commands");

        let endpoint = fetch_endpoint(protocols)?;
        let session = self.factory.connect(&endpoint).await?;

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            match self.handle_read_command_request(&session, request).await {
                Ok(value) => responses.push(value),
                Err(err) => {
                    error!(
                        device = %device_name,
                        resource = %request.device_resource_name,
                        error = %err,
                        "Read command failed, aborting batch"
                    );
                    session.disconnect().await;
                    return Err(ReadBatchError::new(responses, err));
                }
            }
        }

        session.disconnect().await;
        Ok(responses)
    }

    async fn handle_write_commands(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
        _requests: &[CommandRequest],
        _params: &[CommandValue],
    ) -> DriverResult<()> {
        warn!(device = %device_name, "Write commands are not supported");
        Err(DriverError::not_supported("write commands"))
    }

    async fn stop(&self, force: bool) -> DriverResult<()> {
        match &self.state {
            Some(state) => {
                info!(
                    service = %state.service_name,
                    device_name = %state.device_name,
                    force,
                    "Driver is stopping"
                );
                state.watch_handle.abort();
            }
            None => {
                // Shutdown may arrive before initialization completes.
                debug!(force, "Stop requested before initialization");
            }
        }
        Ok(())
    }

    async fn add_device(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
        admin_state: AdminState,
    ) -> DriverResult<()> {
        info!(device = %device_name, admin_state = ?admin_state, "A new device is added");
        Ok(())
    }

    async fn update_device(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
        admin_state: AdminState,
    ) -> DriverResult<()> {
        info!(device = %device_name, admin_state = ?admin_state, "Device is updated");
        Ok(())
    }

    async fn remove_device(
        &self,
        device_name: &str,
        _protocols: &ProtocolProperties,
    ) -> DriverResult<()> {
        info!(device = %device_name, "Device is removed");
        Ok(())
    }

    async fn discover(&self) -> DriverResult<()> {
        debug!("Discovery is not implemented for this driver");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use opcd_sdk::{Value, ValueType};
    use serde_json::json;
    use tempfile::NamedTempFile;

    use crate::session::{NodeReading, StatusInfo};

    // -------------------------------------------------------------------------
    // Mock session machinery
    // -------------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct MockFactory {
        readings: HashMap<String, NodeReading>,
        fail_connect: bool,
        connects: Arc<AtomicUsize>,
        disconnected: Arc<AtomicBool>,
    }

    impl MockFactory {
        fn with_reading(mut self, node: &str, reading: NodeReading) -> Self {
            self.readings.insert(node.to_string(), reading);
            self
        }
    }

    #[async_trait]
    impl SessionFactory for MockFactory {
        type Session = MockSession;

        async fn connect(&self, endpoint: &str) -> DriverResult<Self::Session> {
            if self.fail_connect {
                return Err(DriverError::connection_failed(endpoint, "mock refused"));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.disconnected.store(false, Ordering::SeqCst);
            Ok(MockSession {
                readings: self.readings.clone(),
                disconnected: Arc::clone(&self.disconnected),
            })
        }
    }

    struct MockSession {
        readings: HashMap<String, NodeReading>,
        disconnected: Arc<AtomicBool>,
    }

    #[async_trait]
    impl OpcUaSession for MockSession {
        async fn read_node(&self, node: &NodeId, _max_age: f64) -> DriverResult<NodeReading> {
            Ok(self
                .readings
                .get(&node.to_string())
                .cloned()
                .unwrap_or_else(|| {
                    NodeReading::with_status(StatusInfo::new(0x8034_0000, "BadNodeIdUnknown"))
                }))
        }

        async fn disconnect(&self) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
    }

    fn protocols(endpoint: &str) -> ProtocolProperties {
        HashMap::from([(
            "opcua".to_string(),
            HashMap::from([("Endpoint".to_string(), endpoint.to_string())]),
        )])
    }

    fn read_request(resource: &str, node: &str, value_type: ValueType) -> CommandRequest {
        CommandRequest::new(resource, value_type).with_attribute(NODE_ID_ATTRIBUTE, json!(node))
    }

    // -------------------------------------------------------------------------
    // Read path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_read_batch_success() {
        let factory = MockFactory::default()
            .with_reading("ns=2;i=1", NodeReading::good(Value::Int32(42)))
            .with_reading("ns=2;s=Name", NodeReading::good(Value::String("plc".into())));
        let disconnected = Arc::clone(&factory.disconnected);
        let driver = OpcUaDriver::new(factory);

        let requests = vec![
            read_request("Counter", "ns=2;i=1", ValueType::Int32),
            read_request("Name", "ns=2;s=Name", ValueType::String),
        ];
        let responses = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].value, Value::Int32(42));
        assert_eq!(responses[1].value, Value::String("plc".into()));
        assert!(responses.iter().all(|r| r.origin > 0));
        assert!(disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_batch_aborts_on_first_failure() {
        // Three requests, the second one targets an unknown node.
        let factory = MockFactory::default()
            .with_reading("ns=2;i=1", NodeReading::good(Value::Int32(1)))
            .with_reading("ns=2;i=3", NodeReading::good(Value::Int32(3)));
        let disconnected = Arc::clone(&factory.disconnected);
        let driver = OpcUaDriver::new(factory);

        let requests = vec![
            read_request("A", "ns=2;i=1", ValueType::Int32),
            read_request("B", "ns=2;i=2", ValueType::Int32),
            read_request("C", "ns=2;i=3", ValueType::Int32),
        ];
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap_err();

        assert_eq!(err.completed.len(), 1);
        assert_eq!(err.completed[0].device_resource_name, "A");
        assert_eq!(err.source.error_type(), "read_status");
        assert!(disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_missing_node_attribute() {
        let driver = OpcUaDriver::new(MockFactory::default());
        let requests = vec![CommandRequest::new("NoNode", ValueType::Int32)];
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "contract_invalid");
        assert!(err.source.to_string().contains("nodeId"));
    }

    #[tokio::test]
    async fn test_read_non_string_node_attribute() {
        let driver = OpcUaDriver::new(MockFactory::default());
        let requests =
            vec![CommandRequest::new("BadAttr", ValueType::Int32)
                .with_attribute(NODE_ID_ATTRIBUTE, json!(12))];
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "contract_invalid");
    }

    #[tokio::test]
    async fn test_read_malformed_node_id() {
        let driver = OpcUaDriver::new(MockFactory::default());
        let requests = vec![read_request("Bad", "ns=2;x=1", ValueType::Int32)];
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "contract_invalid");
    }

    #[tokio::test]
    async fn test_read_missing_endpoint_never_connects() {
        let factory = MockFactory::default();
        let connects = Arc::clone(&factory.connects);
        let driver = OpcUaDriver::new(factory);

        let err = driver
            .handle_read_commands("dev", &HashMap::new(), &[])
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "contract_invalid");
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_read_connect_failure() {
        let driver = OpcUaDriver::new(MockFactory {
            fail_connect: true,
            ..Default::default()
        });
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &[])
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "connection_failed");
        assert!(err.completed.is_empty());
    }

    #[tokio::test]
    async fn test_read_coercion_failure_aborts() {
        let factory = MockFactory::default()
            .with_reading("ns=2;s=Text", NodeReading::good(Value::String("oops".into())));
        let driver = OpcUaDriver::new(factory);

        let requests = vec![read_request("Num", "ns=2;s=Text", ValueType::Int32)];
        let err = driver
            .handle_read_commands("dev", &protocols("opc.tcp://host:4840"), &requests)
            .await
            .unwrap_err();

        assert_eq!(err.source.error_type(), "coercion");
        assert!(err.source.to_string().contains("Num"));
    }

    // -------------------------------------------------------------------------
    // Writes, lifecycle, stop
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_write_commands_not_supported() {
        let driver = OpcUaDriver::new(MockFactory::default());
        let err = driver
            .handle_write_commands("dev", &protocols("opc.tcp://host:4840"), &[], &[])
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "not_supported");
    }

    #[tokio::test]
    async fn test_stop_before_initialize() {
        let driver = OpcUaDriver::new(MockFactory::default());
        assert!(driver.stop(false).await.is_ok());
        assert!(driver.stop(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_lifecycle_callbacks_succeed() {
        let driver = OpcUaDriver::new(MockFactory::default());
        let props = protocols("opc.tcp://host:4840");
        assert!(driver.add_device("d", &props, AdminState::Unlocked).await.is_ok());
        assert!(driver.update_device("d", &props, AdminState::Locked).await.is_ok());
        assert!(driver.remove_device("d", &props).await.is_ok());
        assert!(driver.discover().await.is_ok());
    }

    // -------------------------------------------------------------------------
    // Configuration change callback
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_changes_unchanged_value_is_discarded() {
        let writable = RwLock::new(OpcuaWritable {
            resources: "Counter".to_string(),
        });
        OpcUaDriver::<MockFactory>::process_custom_config_changes(
            &writable,
            OpcuaWritable {
                resources: "Counter".to_string(),
            },
        );
        assert_eq!(writable.read().resources, "Counter");
    }

    #[test]
    fn test_config_changes_new_value_is_applied() {
        let writable = RwLock::new(OpcuaWritable {
            resources: "Counter".to_string(),
        });
        OpcUaDriver::<MockFactory>::process_custom_config_changes(
            &writable,
            OpcuaWritable {
                resources: "Counter,Random".to_string(),
            },
        );
        assert_eq!(writable.read().resources, "Counter,Random");
    }

    // -------------------------------------------------------------------------
    // Initialization
    // -------------------------------------------------------------------------

    fn init_context(path: &std::path::Path) -> InitContext {
        let (async_tx, _async_rx) = tokio::sync::mpsc::channel(8);
        let (disc_tx, _disc_rx) = tokio::sync::mpsc::channel(8);
        InitContext {
            service_name: "device-opcua".to_string(),
            config_path: path.to_path_buf(),
            async_values: async_tx,
            discovered_devices: disc_tx,
        }
    }

    #[tokio::test]
    async fn test_initialize_loads_configuration() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[OPCUA]
DeviceName = "SimulationServer"
Policy = "None"
Mode = "None"

[OPCUA.Writable]
Resources = "Counter"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let mut driver = OpcUaDriver::new(MockFactory::default());
        driver.initialize(init_context(file.path())).await.unwrap();

        assert_eq!(
            driver.writable(),
            Some(OpcuaWritable {
                resources: "Counter".to_string()
            })
        );
        assert!(driver.stop(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_state() {
        let write_config = |resources: &str| {
            let mut file = NamedTempFile::with_suffix(".toml").unwrap();
            write!(
                file,
                r#"
[OPCUA]
DeviceName = "SimulationServer"
Policy = "None"
Mode = "None"

[OPCUA.Writable]
Resources = "{resources}"
"#
            )
            .unwrap();
            file.flush().unwrap();
            file
        };

        let first = write_config("Counter");
        let second = write_config("Random");

        let mut driver = OpcUaDriver::new(MockFactory::default());
        driver.initialize(init_context(first.path())).await.unwrap();
        driver.initialize(init_context(second.path())).await.unwrap();

        // Only the second configuration is live.
        assert_eq!(
            driver.writable(),
            Some(OpcuaWritable {
                resources: "Random".to_string()
            })
        );
        assert!(driver.stop(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_configuration() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[OPCUA]
DeviceName = "SimulationServer"
Policy = "Bogus"
Mode = "None"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let mut driver = OpcUaDriver::new(MockFactory::default());
        let err = driver.initialize(init_context(file.path())).await.unwrap_err();
        assert_eq!(err.error_type(), "contract_invalid");
    }
}

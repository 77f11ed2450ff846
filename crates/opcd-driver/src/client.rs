// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Real session implementation using the `opcua` crate.
//!
//! One [`RealSessionFactory::connect`] call produces one session over one
//! secure-channel-free connection. The read path always connects with
//! security policy and mode `None` and an anonymous identity token; the
//! configured policy, mode, and certificate paths are validated at startup
//! but not consulted here.

use std::sync::Arc;

use async_trait::async_trait;
use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;
use tracing::{debug, info};

use opcd_sdk::{DriverError, DriverResult, Value};

use crate::node::NodeId;
use crate::session::{NodeReading, OpcUaSession, SessionFactory, StatusInfo};

// =============================================================================
// RealSessionFactory
// =============================================================================

/// Opens real OPC-UA sessions.
#[derive(Debug, Clone)]
pub struct RealSessionFactory {
    /// Application name announced to the server.
    application_name: String,
    /// Application URI announced to the server.
    application_uri: String,
    /// Session retry limit handed to the client.
    session_retry_limit: i32,
    /// Session timeout in milliseconds.
    session_timeout_ms: u32,
}

impl RealSessionFactory {
    /// Create a factory with the default client identity.
    pub fn new() -> Self {
        Self {
            application_name: "opcd".to_string(),
            application_uri: "urn:opcd".to_string(),
            session_retry_limit: 3,
            session_timeout_ms: 30_000,
        }
    }

    /// Override the announced application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    fn build_client(&self, endpoint: &str) -> DriverResult<Client> {
        ClientBuilder::new()
            .application_name(&self.application_name)
            .application_uri(&self.application_uri)
            .session_retry_limit(self.session_retry_limit)
            .session_timeout(self.session_timeout_ms)
            .trust_server_certs(true)
            .client()
            .ok_or_else(|| {
                DriverError::connection_failed(endpoint, "failed to build client")
            })
    }
}

impl Default for RealSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for RealSessionFactory {
    type Session = RealSession;

    async fn connect(&self, endpoint: &str) -> DriverResult<Self::Session> {
        info!(endpoint = %endpoint, "Connecting to OPC UA server");

        let mut client = self.build_client(endpoint)?;

        let endpoints = client
            .get_server_endpoints_from_url(endpoint)
            .map_err(|e| {
                DriverError::connection_failed(
                    endpoint,
                    format!("failed to fetch server endpoints: {e}"),
                )
            })?;

        let description = endpoints
            .iter()
            .find(|e| {
                e.security_policy_uri.as_ref() == SecurityPolicy::None.to_uri()
                    && e.security_mode == MessageSecurityMode::None
            })
            .cloned()
            .ok_or_else(|| {
                DriverError::connection_failed(endpoint, "no unsecured endpoint offered")
            })?;

        debug!(
            security_policy = %description.security_policy_uri,
            "Found matching endpoint"
        );

        let session = client
            .connect_to_endpoint(description, IdentityToken::Anonymous)
            .map_err(|e| {
                DriverError::connection_failed(endpoint, format!("connect refused: {e}"))
            })?;

        info!(endpoint = %endpoint, "Connected to OPC UA server");

        Ok(RealSession {
            session,
            endpoint: endpoint.to_string(),
        })
    }
}

// =============================================================================
// RealSession
// =============================================================================

/// A live session over the `opcua` crate's synchronous client.
pub struct RealSession {
    session: Arc<OpcUaRwLock<Session>>,
    endpoint: String,
}

#[async_trait]
impl OpcUaSession for RealSession {
    async fn read_node(&self, node: &NodeId, max_age: f64) -> DriverResult<NodeReading> {
        let read_value_id = ReadValueId {
            node_id: node.to_opcua(),
            attribute_id: AttributeId::Value as u32,
            index_range: opcua::types::UAString::null(),
            data_encoding: opcua::types::QualifiedName::null(),
        };

        let results = {
            let session = self.session.read();
            session
                .read(&[read_value_id], TimestampsToReturn::Both, max_age)
                .map_err(|e| {
                    DriverError::read_status(node.to_string(), format!("{e:?}"))
                })?
        };

        let data_value = match results.first() {
            Some(dv) => dv,
            None => {
                return Ok(NodeReading::with_status(StatusInfo::new(
                    0x8000_0000,
                    "BadUnexpectedError",
                )))
            }
        };

        let status = data_value
            .status
            .as_ref()
            .map(|s| StatusInfo::new(s.bits(), format!("{s:?}")))
            .unwrap_or_else(StatusInfo::good);

        Ok(NodeReading {
            value: data_value
                .value
                .as_ref()
                .map(from_variant)
                .unwrap_or(Value::Null),
            status,
            source_timestamp: data_value.source_timestamp.as_ref().map(to_chrono),
            server_timestamp: data_value.server_timestamp.as_ref().map(to_chrono),
        })
    }

    async fn disconnect(&self) {
        info!(endpoint = %self.endpoint, "Disconnecting from OPC UA server");
        let session = self.session.read();
        session.disconnect();
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn to_chrono(t: &opcua::types::DateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(
        t.as_chrono().timestamp(),
        t.as_chrono().timestamp_subsec_nanos(),
    )
    .unwrap_or_else(chrono::Utc::now)
}

/// Convert a client library variant into the framework value model.
fn from_variant(variant: &opcua::types::Variant) -> Value {
    use opcua::types::Variant;

    match variant {
        Variant::Empty => Value::Null,
        Variant::Boolean(v) => Value::Bool(*v),
        Variant::SByte(v) => Value::Int8(*v),
        Variant::Byte(v) => Value::Uint8(*v),
        Variant::Int16(v) => Value::Int16(*v),
        Variant::UInt16(v) => Value::Uint16(*v),
        Variant::Int32(v) => Value::Int32(*v),
        Variant::UInt32(v) => Value::Uint32(*v),
        Variant::Int64(v) => Value::Int64(*v),
        Variant::UInt64(v) => Value::Uint64(*v),
        Variant::Float(v) => Value::Float32(*v),
        Variant::Double(v) => Value::Float64(*v),
        Variant::String(v) => Value::String(v.as_ref().to_string()),
        Variant::DateTime(v) => Value::DateTime(to_chrono(v)),
        Variant::Guid(v) => Value::String(v.to_string()),
        Variant::ByteString(v) => Value::Bytes(v.value.clone().unwrap_or_default()),
        // Arrays and complex types are rendered as their debug form; the
        // conversion layer treats them as strings.
        other => Value::String(format!("{other:?}")),
    }
}

// =============================================================================
// Tests
// =============================================================================

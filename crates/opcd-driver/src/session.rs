// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session abstraction over the OPC-UA client library.
//!
//! The driver never talks to the client library directly; it goes through
//! [`SessionFactory`] and [`OpcUaSession`] so tests can substitute a mock.
//! Connection scope is one read batch: the driver connects at batch entry
//! and disconnects on every exit path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcd_sdk::{DriverResult, Value};

use crate::node::NodeId;

// =============================================================================
// NodeReading
// =============================================================================

/// Per-node result of a session read.
#[derive(Debug, Clone)]
pub struct NodeReading {
    /// The raw value, if the server returned one.
    pub value: Value,
    /// Status reported for this node.
    pub status: StatusInfo,
    /// Timestamp assigned by the data source.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Timestamp assigned by the server.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl NodeReading {
    /// A good reading carrying a value.
    pub fn good(value: Value) -> Self {
        Self {
            value,
            status: StatusInfo::good(),
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    /// A reading with an explicit status and no value.
    pub fn with_status(status: StatusInfo) -> Self {
        Self {
            value: Value::Null,
            status,
            source_timestamp: None,
            server_timestamp: None,
        }
    }
}

/// Protocol status reported for a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    /// Raw status code bits.
    pub code: u32,
    /// Symbolic name of the status.
    pub name: String,
}

impl StatusInfo {
    /// The OK status.
    pub fn good() -> Self {
        Self {
            code: 0,
            name: "Good".to_string(),
        }
    }

    /// Build a status from raw bits and a symbolic name.
    pub fn new(code: u32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }

    /// Whether the status is exactly `Good`.
    ///
    /// Sub-codes in the good severity band (e.g. `GoodClamped`) still fail
    /// this check; a read aborts on anything other than plain `Good`.
    pub fn is_good(&self) -> bool {
        self.code == 0
    }
}

impl std::fmt::Display for StatusInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Session Traits
// =============================================================================

/// A live session against one OPC-UA server.
#[async_trait]
pub trait OpcUaSession: Send + Sync {
    /// Read the value attribute of a single node.
    ///
    /// `max_age` is the staleness tolerance in milliseconds handed to the
    /// server; both source and server timestamps are requested.
    async fn read_node(&self, node: &NodeId, max_age: f64) -> DriverResult<NodeReading>;

    /// Close the session.
    async fn disconnect(&self);
}

/// Opens sessions against OPC-UA endpoints.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// The session type this factory produces.
    type Session: OpcUaSession;

    /// Connect to the given endpoint address.
    async fn connect(&self, endpoint: &str) -> DriverResult<Self::Session>;
}

// =============================================================================
// Tests
// =============================================================================

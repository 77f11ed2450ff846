// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC-UA node identifiers.
//!
//! Device-profile resources carry their target node as a `"nodeId"` string
//! attribute in the standard OPC UA notation, e.g. `ns=2;i=1001` or
//! `ns=2;s=Counter`. This module parses and renders that notation and
//! converts to the client library's node id type.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use opcd_sdk::DriverError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// NodeId
// =============================================================================

/// An OPC-UA node identifier: namespace index plus identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index on the server.
    pub namespace_index: u16,
    /// The identifier within that namespace.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Create a numeric node id.
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Create a string node id.
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Create a GUID node id.
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Create an opaque (byte string) node id.
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Convert to the client library's node id type.
    pub fn to_opcua(&self) -> opcua::types::NodeId {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(self.namespace_index, *v),
            NodeIdentifier::String(v) => {
                opcua::types::NodeId::new(self.namespace_index, v.clone())
            }
            NodeIdentifier::Guid(v) => {
                opcua::types::NodeId::new(self.namespace_index, opcua::types::Guid::from(*v))
            }
            NodeIdentifier::Opaque(v) => opcua::types::NodeId::new(
                self.namespace_index,
                opcua::types::ByteString::from(v.as_slice()),
            ),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => write!(f, "ns={};i={}", self.namespace_index, v),
            NodeIdentifier::String(v) => write!(f, "ns={};s={}", self.namespace_index, v),
            NodeIdentifier::Guid(v) => write!(f, "ns={};g={}", self.namespace_index, v),
            NodeIdentifier::Opaque(v) => {
                write!(f, "ns={};b={}", self.namespace_index, BASE64.encode(v))
            }
        }
    }
}

impl FromStr for NodeId {
    type Err = DriverError;

    /// Parse a node id from the standard OPC UA string notation.
    ///
    /// Supported forms:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` / `s=MyNode` (namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = if s.starts_with("ns=") {
            let parts: Vec<&str> = s.splitn(2, ';').collect();
            if parts.len() != 2 {
                return Err(invalid_node_id(s, "missing identifier after namespace"));
            }

            let ns_str = parts[0].trim_start_matches("ns=");
            let ns: u16 = ns_str
                .parse()
                .map_err(|_| invalid_node_id(s, "invalid namespace index"))?;

            (ns, parts[1])
        } else {
            (0, s)
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            let value: u32 = id
                .parse()
                .map_err(|_| invalid_node_id(s, "invalid numeric identifier"))?;
            NodeIdentifier::Numeric(value)
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            let uuid = Uuid::parse_str(id)
                .map_err(|e| invalid_node_id(s, format!("invalid GUID: {e}")))?;
            NodeIdentifier::Guid(uuid)
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            let bytes = BASE64
                .decode(id)
                .map_err(|e| invalid_node_id(s, format!("invalid base64: {e}")))?;
            NodeIdentifier::Opaque(bytes)
        } else {
            return Err(invalid_node_id(
                s,
                "unknown identifier type, expected i=, s=, g=, or b=",
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

fn invalid_node_id(input: &str, reason: impl Into<String>) -> DriverError {
    DriverError::contract_invalid(format!("invalid node id '{}': {}", input, reason.into()))
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The identifier portion of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeIdentifier {
    /// Numeric identifier (`i=`).
    Numeric(u32),
    /// String identifier (`s=`).
    String(String),
    /// GUID identifier (`g=`).
    Guid(Uuid),
    /// Opaque byte-string identifier (`b=`).
    Opaque(Vec<u8>),
}

// =============================================================================
// Tests
// =============================================================================

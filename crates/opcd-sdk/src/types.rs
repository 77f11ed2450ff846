// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types exchanged between the host runtime and protocol drivers.
//!
//! The host schedules command requests against device resources and expects
//! tagged command values back. Drivers never construct requests themselves;
//! they translate them into protocol operations and wrap the readings into
//! [`CommandValue`]s.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed reading value.
///
/// Protocol drivers produce these from raw device data. The variant set
/// covers every scalar the value-type dispatch supports plus the raw forms
/// a protocol stack may hand back (bytes, timestamps, null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 8-bit unsigned integer
    Uint8(u8),
    /// 16-bit unsigned integer
    Uint16(u16),
    /// 32-bit unsigned integer
    Uint32(u32),
    /// 64-bit unsigned integer
    Uint64(u64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Raw byte sequence
    Bytes(Vec<u8>),
    /// Timestamp value
    DateTime(chrono::DateTime<chrono::Utc>),
    /// Absent value
    Null,
}

impl Value {
    /// Human-readable name of the contained type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint8(_) => "uint8",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
        }
    }

    /// Try to interpret the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to widen the value into a signed 64-bit integer.
    ///
    /// Returns `None` for unsigned values above `i64::MAX` and for
    /// non-integer variants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Uint8(v) => Some(i64::from(*v)),
            Value::Uint16(v) => Some(i64::from(*v)),
            Value::Uint32(v) => Some(i64::from(*v)),
            Value::Uint64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Try to widen the value into an unsigned 64-bit integer.
    ///
    /// Negative signed values yield `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int8(v) => u64::try_from(*v).ok(),
            Value::Int16(v) => u64::try_from(*v).ok(),
            Value::Int32(v) => u64::try_from(*v).ok(),
            Value::Int64(v) => u64::try_from(*v).ok(),
            Value::Uint8(v) => Some(u64::from(*v)),
            Value::Uint16(v) => Some(u64::from(*v)),
            Value::Uint32(v) => Some(u64::from(*v)),
            Value::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to interpret the value as a 64-bit float.
    ///
    /// Integers convert losslessly up to 2^53.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64).or_else(|| self.as_u64().map(|v| v as f64)),
        }
    }

    /// Try to borrow the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "{v:?}"),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Null => write!(f, "null"),
        }
    }
}

// =============================================================================
// ValueType
// =============================================================================

/// Requested value-type tag carried by a device-profile resource.
///
/// The host looks this up from the profile and drivers dispatch on it when
/// converting readings. `Binary` and `Object` exist in profiles but are not
/// convertible by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Boolean
    Bool,
    /// UTF-8 string
    String,
    /// 8-bit unsigned integer
    Uint8,
    /// 16-bit unsigned integer
    Uint16,
    /// 32-bit unsigned integer
    Uint32,
    /// 64-bit unsigned integer
    Uint64,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Opaque binary payload
    Binary,
    /// Structured object payload
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "Bool",
            ValueType::String => "String",
            ValueType::Uint8 => "Uint8",
            ValueType::Uint16 => "Uint16",
            ValueType::Uint32 => "Uint32",
            ValueType::Uint64 => "Uint64",
            ValueType::Int8 => "Int8",
            ValueType::Int16 => "Int16",
            ValueType::Int32 => "Int32",
            ValueType::Int64 => "Int64",
            ValueType::Float32 => "Float32",
            ValueType::Float64 => "Float64",
            ValueType::Binary => "Binary",
            ValueType::Object => "Object",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Command Request / Value
// =============================================================================

/// A single read or write request scheduled by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Name of the device resource being addressed.
    pub device_resource_name: String,
    /// Protocol-specific attributes from the device profile.
    ///
    /// Readable OPC-UA resources must carry a `"nodeId"` string attribute.
    pub attributes: HashMap<String, serde_json::Value>,
    /// The value type the host expects back.
    pub value_type: ValueType,
}

impl CommandRequest {
    /// Build a request for a resource with the given type tag.
    pub fn new(resource: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            device_resource_name: resource.into(),
            attributes: HashMap::new(),
            value_type,
        }
    }

    /// Attach an attribute, consuming and returning the request.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// A typed reading handed back to the host runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandValue {
    /// The device resource this value belongs to.
    pub device_resource_name: String,
    /// The type tag the value was converted to.
    pub value_type: ValueType,
    /// The converted value.
    pub value: Value,
    /// Origin timestamp in milliseconds since the Unix epoch, captured at
    /// conversion time.
    pub origin: i64,
}

impl CommandValue {
    /// Construct a command value with an explicit origin timestamp.
    pub fn new_with_origin(
        resource: impl Into<String>,
        value_type: ValueType,
        value: Value,
        origin: i64,
    ) -> Self {
        Self {
            device_resource_name: resource.into(),
            value_type,
            value,
            origin,
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={} ({}, origin={})",
            self.device_resource_name, self.value, self.value_type, self.origin
        )
    }
}

// =============================================================================
// Device & Protocol Metadata
// =============================================================================

/// Per-device protocol properties supplied by the host's device registry.
///
/// Keyed by protocol name; the `"opcua"` entry carries at least an
/// `"Endpoint"` property.
pub type ProtocolProperties = HashMap<String, HashMap<String, String>>;

/// Administrative state of a device as tracked by the host registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminState {
    /// Device accepts commands.
    Unlocked,
    /// Device is administratively locked out.
    Locked,
}

/// A batch of asynchronously produced readings pushed to the host.
#[derive(Debug, Clone)]
pub struct AsyncValues {
    /// Device the readings originate from.
    pub device_name: String,
    /// The readings themselves.
    pub values: Vec<CommandValue>,
}

/// A device found during protocol discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Suggested device name.
    pub name: String,
    /// Protocol properties needed to reach the device.
    pub protocols: ProtocolProperties,
    /// Free-form description.
    pub description: String,
}

// =============================================================================
// Tests
// =============================================================================

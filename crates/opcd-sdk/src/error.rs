// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for protocol drivers.
//!
//! Every error kind a driver can surface to the host runtime lives here.
//! All errors are returned synchronously from the invoking call; the driver
//! never retries internally, so a kind only needs to tell the host what
//! class of failure occurred.

use thiserror::Error;

use crate::types::{CommandValue, ValueType};

/// Result alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

// =============================================================================
// DriverError
// =============================================================================

/// Errors surfaced by a protocol driver to the host runtime.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A required configuration value, protocol property, or resource
    /// attribute is missing or malformed.
    #[error("contract invalid: {message}")]
    ContractInvalid {
        /// What was wrong with the contract.
        message: String,
    },

    /// A raw reading could not be coerced into the requested value type.
    #[error("fail to parse {resource} reading, {message}")]
    Coercion {
        /// The device resource whose reading failed to convert.
        resource: String,
        /// The underlying coercion failure.
        message: String,
    },

    /// The requested value type is outside the supported set.
    #[error("return result fail, none supported value type: {value_type}")]
    UnsupportedType {
        /// The unsupported tag.
        value_type: ValueType,
    },

    /// Establishing the protocol connection failed.
    #[error("connection to {endpoint} failed: {message}")]
    ConnectionFailed {
        /// Endpoint the driver tried to reach.
        endpoint: String,
        /// Client library error detail.
        message: String,
    },

    /// A per-node read returned a non-OK status code.
    #[error("read of node {node} returned status {status}")]
    ReadStatus {
        /// Node identifier that was read.
        node: String,
        /// Protocol status code, rendered.
        status: String,
    },

    /// The operation is not supported by this driver.
    #[error("{operation} is not supported")]
    NotSupported {
        /// Name of the unsupported operation.
        operation: String,
    },
}

impl DriverError {
    /// Build a contract-invalid error.
    pub fn contract_invalid(message: impl Into<String>) -> Self {
        Self::ContractInvalid {
            message: message.into(),
        }
    }

    /// Build a coercion error naming the failing resource.
    pub fn coercion(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Coercion {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Build an unsupported-type error.
    pub fn unsupported_type(value_type: ValueType) -> Self {
        Self::UnsupportedType { value_type }
    }

    /// Build a connection-failed error.
    pub fn connection_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Build a read-status error.
    pub fn read_status(node: impl Into<String>, status: impl Into<String>) -> Self {
        Self::ReadStatus {
            node: node.into(),
            status: status.into(),
        }
    }

    /// Build a not-supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    /// Stable discriminant used in structured logs and tests.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::ContractInvalid { .. } => "contract_invalid",
            Self::Coercion { .. } => "coercion",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::ReadStatus { .. } => "read_status",
            Self::NotSupported { .. } => "not_supported",
        }
    }
}

// =============================================================================
// ReadBatchError
// =============================================================================

/// Outcome of a read batch that aborted on its first failing request.
///
/// The host receives the results converted before the failure together with
/// the error itself; requests after the failing one were never attempted.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct ReadBatchError {
    /// Results converted before the failure, in request order.
    pub completed: Vec<CommandValue>,
    /// The failure that aborted the batch.
    #[source]
    pub source: DriverError,
}

impl ReadBatchError {
    /// Wrap a driver error with the results accumulated so far.
    pub fn new(completed: Vec<CommandValue>, source: DriverError) -> Self {
        Self { completed, source }
    }
}

impl From<DriverError> for ReadBatchError {
    fn from(source: DriverError) -> Self {
        Self {
            completed: Vec::new(),
            source,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_error_types() {
        assert_eq!(
            DriverError::contract_invalid("missing endpoint").error_type(),
            "contract_invalid"
        );
        assert_eq!(
            DriverError::coercion("Temp", "invalid digit").error_type(),
            "coercion"
        );
        assert_eq!(
            DriverError::unsupported_type(ValueType::Object).error_type(),
            "unsupported_type"
        );
    }

    #[test]
    fn test_coercion_message_names_resource() {
        let err = DriverError::coercion("Pressure", "not a number");
        assert!(err.to_string().contains("Pressure"));
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn test_unsupported_type_message() {
        let err = DriverError::unsupported_type(ValueType::Binary);
        assert!(err.to_string().contains("none supported value type: Binary"));
    }

    #[test]
    fn test_read_batch_error_preserves_partials() {
        let partial = CommandValue::new_with_origin("A", ValueType::Int32, Value::Int32(1), 1);
        let err = ReadBatchError::new(
            vec![partial.clone()],
            DriverError::read_status("ns=2;i=5", "BadNodeIdUnknown"),
        );
        assert_eq!(err.completed, vec![partial]);
        assert_eq!(err.source.error_type(), "read_status");
    }
}

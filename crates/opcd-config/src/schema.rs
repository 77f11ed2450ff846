// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Custom configuration schema for the OPC-UA device service.
//!
//! The host's configuration provider populates [`ServiceConfig`] from the
//! service configuration file. Only the nested [`OpcuaWritable`] section is
//! eligible for live updates; everything else requires a restart.
//!
//! Field names follow the host convention of PascalCase keys:
//!
//! ```toml
//! [OPCUA]
//! DeviceName = "SimulationServer"
//! Policy = "None"
//! Mode = "None"
//! CertFile = ""
//! KeyFile = ""
//!
//! [OPCUA.Writable]
//! Resources = "Counter,Random"
//! ```

use opcd_sdk::{DriverError, DriverResult, ProtocolProperties};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Security policies the service accepts.
pub const SECURITY_POLICIES: [&str; 4] = ["None", "Basic128Rsa15", "Basic256", "Basic256Sha256"];

/// Security modes the service accepts.
pub const SECURITY_MODES: [&str; 3] = ["None", "Sign", "SignAndEncrypt"];

/// Protocol key in the per-device protocol property map.
pub const PROTOCOL_NAME: &str = "opcua";

/// Property key carrying the server address within the protocol entry.
pub const ENDPOINT_PROPERTY: &str = "Endpoint";

// =============================================================================
// ServiceConfig
// =============================================================================

/// Top-level service configuration container.
///
/// Constructed empty at initialization and populated by the configuration
/// loader. Revalidated whenever the writable subsection changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// The OPC-UA custom configuration block.
    #[serde(rename = "OPCUA", default)]
    pub opcua: OpcuaConfig,
}

impl ServiceConfig {
    /// Validate the nested custom configuration block.
    pub fn validate(&self) -> ConfigResult<()> {
        self.opcua.validate()
    }
}

// =============================================================================
// OpcuaConfig
// =============================================================================

/// The OPC-UA custom configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct OpcuaConfig {
    /// Name of the device this service fronts. Required, non-empty.
    #[serde(default)]
    pub device_name: String,

    /// Security policy for the protocol channel.
    #[serde(default)]
    pub policy: String,

    /// Security mode for the protocol channel.
    #[serde(default)]
    pub mode: String,

    /// Path to the client certificate file.
    #[serde(default)]
    pub cert_file: String,

    /// Path to the client private key file.
    #[serde(default)]
    pub key_file: String,

    /// The live-updatable subsection.
    #[serde(default)]
    pub writable: OpcuaWritable,
}

impl OpcuaConfig {
    /// Validate the configuration block.
    ///
    /// Checks run in order and the first failure is returned: device name
    /// must be non-empty, the policy must be in [`SECURITY_POLICIES`], and
    /// the mode must be in [`SECURITY_MODES`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.device_name.is_empty() {
            return Err(ConfigError::validation(
                "DeviceName",
                "device name cannot be empty",
            ));
        }

        if !SECURITY_POLICIES.contains(&self.policy.as_str()) {
            return Err(ConfigError::validation(
                "Policy",
                format!(
                    "'{}' is not a valid security policy, legal values: {}",
                    self.policy,
                    SECURITY_POLICIES.join(", ")
                ),
            ));
        }

        if !SECURITY_MODES.contains(&self.mode.as_str()) {
            return Err(ConfigError::validation(
                "Mode",
                format!(
                    "'{}' is not a valid security mode, legal values: {}",
                    self.mode,
                    SECURITY_MODES.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// OpcuaWritable
// =============================================================================

/// The writable subsection, updatable at runtime without a restart.
///
/// Structural equality drives change detection in the update callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct OpcuaWritable {
    /// Comma-separated resource names eligible for monitoring.
    #[serde(default)]
    pub resources: String,
}

// =============================================================================
// Endpoint Lookup
// =============================================================================

/// Extract the OPC-UA endpoint address from a device's protocol properties.
///
/// Looks up the `"opcua"` protocol entry and its `"Endpoint"` property.
/// Either key missing is a contract violation by the device definition.
pub fn fetch_endpoint(protocols: &ProtocolProperties) -> DriverResult<String> {
    let properties = protocols.get(PROTOCOL_NAME).ok_or_else(|| {
        DriverError::contract_invalid(format!(
            "protocol properties have no '{PROTOCOL_NAME}' entry"
        ))
    })?;

    properties
        .get(ENDPOINT_PROPERTY)
        .cloned()
        .ok_or_else(|| {
            DriverError::contract_invalid(format!(
                "'{PROTOCOL_NAME}' protocol properties have no '{ENDPOINT_PROPERTY}' property"
            ))
        })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> OpcuaConfig {
        OpcuaConfig {
            device_name: "SimulationServer".to_string(),
            policy: "None".to_string(),
            mode: "None".to_string(),
            cert_file: String::new(),
            key_file: String::new(),
            writable: OpcuaWritable::default(),
        }
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_device_name() {
        let mut config = valid_config();
        config.device_name.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.error_type(), "validation");
        assert!(err.to_string().contains("DeviceName"));
    }

    #[test]
    fn test_validate_rejects_unknown_policy() {
        for bad in ["none", "Basic256Sha", "Aes128Sha256RsaOaep", ""] {
            let mut config = valid_config();
            config.policy = bad.to_string();
            let err = config.validate().unwrap_err();
            assert_eq!(err.error_type(), "validation");
            assert!(err.to_string().contains("Basic256Sha256"));
        }
    }

    #[test]
    fn test_validate_accepts_every_policy_in_table() {
        for policy in SECURITY_POLICIES {
            let mut config = valid_config();
            config.policy = policy.to_string();
            assert!(config.validate().is_ok(), "policy {policy} rejected");
        }
    }

    #[test]
    fn test_validate_rejects_unknown_mode() {
        for bad in ["sign", "Encrypt", ""] {
            let mut config = valid_config();
            config.mode = bad.to_string();
            let err = config.validate().unwrap_err();
            assert_eq!(err.error_type(), "validation");
            assert!(err.to_string().contains("SignAndEncrypt"));
        }
    }

    #[test]
    fn test_validate_accepts_every_mode_in_table() {
        for mode in SECURITY_MODES {
            let mut config = valid_config();
            config.mode = mode.to_string();
            assert!(config.validate().is_ok(), "mode {mode} rejected");
        }
    }

    #[test]
    fn test_validate_order_reports_name_first() {
        let config = OpcuaConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("DeviceName"));
    }

    #[test]
    fn test_fetch_endpoint_success() {
        let mut props = HashMap::new();
        props.insert(
            "opcua".to_string(),
            HashMap::from([("Endpoint".to_string(), "opc.tcp://host:4840".to_string())]),
        );
        assert_eq!(fetch_endpoint(&props).unwrap(), "opc.tcp://host:4840");
    }

    #[test]
    fn test_fetch_endpoint_missing_protocol() {
        let err = fetch_endpoint(&HashMap::new()).unwrap_err();
        assert_eq!(err.error_type(), "contract_invalid");
    }

    #[test]
    fn test_fetch_endpoint_missing_property() {
        let mut props = HashMap::new();
        props.insert("opcua".to_string(), HashMap::new());
        let err = fetch_endpoint(&props).unwrap_err();
        assert_eq!(err.error_type(), "contract_invalid");
        assert!(err.to_string().contains("Endpoint"));
    }

    #[test]
    fn test_writable_equality_detects_change() {
        let a = OpcuaWritable {
            resources: "Counter".to_string(),
        };
        let b = OpcuaWritable {
            resources: "Counter".to_string(),
        };
        let c = OpcuaWritable {
            resources: "Counter,Random".to_string(),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml = r#"
            [OPCUA]
            DeviceName = "SimulationServer"
            Policy = "Basic256"
            Mode = "Sign"
            CertFile = "/etc/opcd/cert.der"
            KeyFile = "/etc/opcd/key.pem"

            [OPCUA.Writable]
            Resources = "Counter,Random"
        "#;
        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.opcua.device_name, "SimulationServer");
        assert_eq!(config.opcua.policy, "Basic256");
        assert_eq!(config.opcua.mode, "Sign");
        assert_eq!(config.opcua.writable.resources, "Counter,Random");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = r#"
            [OPCUA]
            DeviceName = "x"
            Policy = "None"
            Mode = "None"
            Unexpected = 1
        "#;
        assert!(toml::from_str::<ServiceConfig>(toml).is_err());
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading for the OPC-UA device service.
//!
//! Loads, parses, and validates the service configuration file in TOML,
//! YAML, or JSON format, with environment variable overrides.
//!
//! # Loading Pipeline
//!
//! 1. Parse the file into [`ServiceConfig`]
//! 2. Resolve `${VAR}` placeholders in the raw content
//! 3. Apply `OPCD_*` environment variable overrides
//! 4. Resolve relative certificate/key paths
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! OPCD_DEVICE_NAME=SimulationServer
//! OPCD_POLICY=Basic256
//! OPCD_MODE=Sign
//! OPCD_RESOURCES=Counter,Random
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::ServiceConfig;

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loader for the service configuration file.
///
/// # Examples
///
/// ```no_run
/// use opcd_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("opcd.toml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables in values.
    resolve_env_vars: bool,

    /// Whether to resolve relative certificate/key paths.
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Create a loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: "OPCD".to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Set the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Set the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enable or disable environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enable or disable relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is determined by the extension: `.toml`, `.yaml`/`.yml`,
    /// or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;
        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config);
        }

        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        info!(
            device_name = %config.opcua.device_name,
            policy = %config.opcua.policy,
            mode = %config.opcua.mode,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a string in the given format.
    pub fn load_from_str(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<ServiceConfig> {
        let mut config = self.parse_str(content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config);
        }

        config.validate()?;

        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<ServiceConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        self.parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    fn parse_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ServiceConfig> {
        match format {
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
        }
    }

    /// Resolve `${VAR}` or `${VAR:default}` placeholders in raw content.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_content = String::new();
                let mut found_close = false;

                for c in chars.by_ref() {
                    if c == '}' {
                        found_close = true;
                        break;
                    }
                    var_content.push(c);
                }

                if !found_close {
                    result.push('$');
                    result.push('{');
                    result.push_str(&var_content);
                    continue;
                }

                let (var_name, default_value) = if let Some(idx) = var_content.find(':') {
                    (&var_content[..idx], Some(&var_content[idx + 1..]))
                } else {
                    (var_content.as_str(), None)
                };

                match env::var(var_name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        if let Some(default) = default_value {
                            result.push_str(default);
                        } else {
                            warn!("Environment variable '{}' not found", var_name);
                            result.push_str(&format!("${{{var_name}}}"));
                        }
                    }
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Apply `OPCD_*` environment variable overrides.
    fn apply_env_overrides(&self, config: &mut ServiceConfig) {
        if let Ok(value) = env::var(format!("{}_DEVICE_NAME", self.env_prefix)) {
            config.opcua.device_name = value;
        }
        if let Ok(value) = env::var(format!("{}_POLICY", self.env_prefix)) {
            config.opcua.policy = value;
        }
        if let Ok(value) = env::var(format!("{}_MODE", self.env_prefix)) {
            config.opcua.mode = value;
        }
        if let Ok(value) = env::var(format!("{}_CERT_FILE", self.env_prefix)) {
            config.opcua.cert_file = value;
        }
        if let Ok(value) = env::var(format!("{}_KEY_FILE", self.env_prefix)) {
            config.opcua.key_file = value;
        }
        if let Ok(value) = env::var(format!("{}_RESOURCES", self.env_prefix)) {
            config.opcua.writable.resources = value;
        }
    }

    /// Resolve relative certificate and key paths against the base path.
    fn resolve_relative_paths(&self, config: &mut ServiceConfig, base_path: &Path) {
        for file in [&mut config.opcua.cert_file, &mut config.opcua.key_file] {
            if !file.is_empty() && Path::new(file.as_str()).is_relative() {
                *file = base_path.join(file.as_str()).to_string_lossy().into_owned();
            }
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format.
    Toml,
    /// YAML format.
    Yaml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determine the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// ConfigWatcher
// =============================================================================

/// Configuration file watcher for live updates of the writable subsection.
///
/// Note: this polls the file modification time. For production use,
/// consider using the `notify` crate for proper file system watching.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    loader: ConfigLoader,
    last_modified: Option<std::time::SystemTime>,
}

impl ConfigWatcher {
    /// Create a watcher over a configuration file.
    pub fn new(path: impl Into<PathBuf>, loader: ConfigLoader) -> Self {
        Self {
            path: path.into(),
            loader,
            last_modified: None,
        }
    }

    /// Check whether the file has been modified since the last check.
    ///
    /// The first call records the current modification time and reports no
    /// change.
    pub fn has_changed(&mut self) -> bool {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(_) => return false,
        };

        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(_) => return false,
        };

        if let Some(last) = self.last_modified {
            if modified > last {
                self.last_modified = Some(modified);
                return true;
            }
        } else {
            self.last_modified = Some(modified);
        }

        false
    }

    /// Reload the configuration if the file changed.
    pub fn reload_if_changed(&mut self) -> ConfigResult<Option<ServiceConfig>> {
        if self.has_changed() {
            let config = self.loader.load(&self.path)?;
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }

    /// Force a reload regardless of modification time.
    pub fn reload(&self) -> ConfigResult<ServiceConfig> {
        self.loader.load(&self.path)
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Load configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServiceConfig> {
    ConfigLoader::new().load(path)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_toml() -> String {
        r#"
[OPCUA]
DeviceName = "SimulationServer"
Policy = "None"
Mode = "None"
CertFile = ""
KeyFile = ""

[OPCUA.Writable]
Resources = "Counter,Random"
"#
        .to_string()
    }

    #[test]
    fn test_load_toml() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(create_test_toml().as_bytes()).unwrap();

        let loader = ConfigLoader::new().with_env_vars(false);
        let config = loader.load(file.path()).unwrap();

        assert_eq!(config.opcua.device_name, "SimulationServer");
        assert_eq!(config.opcua.writable.resources, "Counter,Random");
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
OPCUA:
  DeviceName: SimulationServer
  Policy: Basic256
  Mode: Sign
  Writable:
    Resources: Counter
"#;
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loader = ConfigLoader::new().with_env_vars(false);
        let config = loader.load(file.path()).unwrap();

        assert_eq!(config.opcua.policy, "Basic256");
        assert_eq!(config.opcua.mode, "Sign");
    }

    #[test]
    fn test_load_rejects_invalid_policy() {
        let toml = r#"
[OPCUA]
DeviceName = "x"
Policy = "Bogus"
Mode = "None"
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let loader = ConfigLoader::new().with_env_vars(false);
        let err = loader.load(file.path()).unwrap_err();
        assert_eq!(err.error_type(), "validation");
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("opcd.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("opcd.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("opcd.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("opcd.ini")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let loader = ConfigLoader::new();
        let result = loader.resolve_env_placeholders("name: ${OPCD_TEST_NONEXISTENT:fallback}");
        assert_eq!(result, "name: fallback");
    }

    #[test]
    fn test_file_not_found() {
        let loader = ConfigLoader::new();
        let result = loader.load("/nonexistent/opcd.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_relative_cert_paths_resolved() {
        let toml = r#"
[OPCUA]
DeviceName = "x"
Policy = "None"
Mode = "None"
CertFile = "certs/client.der"
KeyFile = "certs/client.pem"
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let loader = ConfigLoader::new()
            .with_env_vars(false)
            .with_base_path("/etc/opcd");
        let config = loader.load(file.path()).unwrap();

        assert_eq!(config.opcua.cert_file, "/etc/opcd/certs/client.der");
        assert_eq!(config.opcua.key_file, "/etc/opcd/certs/client.pem");
    }

    #[test]
    fn test_config_watcher_detects_rewrite() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(create_test_toml().as_bytes()).unwrap();
        file.flush().unwrap();

        let loader = ConfigLoader::new().with_env_vars(false);
        let mut watcher = ConfigWatcher::new(file.path(), loader);

        // First check records the baseline.
        assert!(!watcher.has_changed());
        assert!(watcher.reload_if_changed().unwrap().is_none());

        // Rewrite with updated resources and a strictly newer mtime.
        let updated = create_test_toml().replace("Counter,Random", "Counter,Random,Sawtooth");
        fs::write(file.path(), updated).unwrap();
        let bumped = std::time::SystemTime::now() + std::time::Duration::from_secs(2);
        fs::File::options()
            .write(true)
            .open(file.path())
            .unwrap()
            .set_modified(bumped)
            .unwrap();

        let config = watcher.reload_if_changed().unwrap().unwrap();
        assert_eq!(config.opcua.writable.resources, "Counter,Random,Sawtooth");

        // No further change is reported until the file is touched again.
        assert!(watcher.reload_if_changed().unwrap().is_none());

        assert!(watcher.reload().is_ok());
    }

    #[test]
    fn test_load_from_str() {
        let loader = ConfigLoader::new().with_env_vars(false);
        let config = loader
            .load_from_str(&create_test_toml(), ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.opcua.device_name, "SimulationServer");
    }
}

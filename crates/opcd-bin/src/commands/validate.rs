// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `validate` command: check the configuration file without starting
//! the service.

use tracing::info;

use opcd_config::ConfigLoader;

use crate::cli::{Cli, ValidateArgs};
use crate::error::AppResult;

/// Load and validate the configuration file.
pub fn execute(cli: &Cli, args: &ValidateArgs) -> AppResult<()> {
    let loader = ConfigLoader::new();
    let config = loader.load(&cli.config)?;

    info!(config = %cli.config.display(), "Configuration is valid");
    println!("Configuration is valid: {}", cli.config.display());
    println!("  DeviceName: {}", config.opcua.device_name);
    println!("  Policy:     {}", config.opcua.policy);
    println!("  Mode:       {}", config.opcua.mode);

    if args.show_config {
        match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("\n{rendered}"),
            Err(e) => println!("\n(unable to render configuration: {e})"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_accepts_valid_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[OPCUA]
DeviceName = "SimulationServer"
Policy = "None"
Mode = "None"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let cli = Cli::parse_from(["opcd", "-c", file.path().to_str().unwrap(), "validate"]);
        let result = execute(&cli, &ValidateArgs::default());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
[OPCUA]
DeviceName = ""
Policy = "None"
Mode = "None"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let cli = Cli::parse_from(["opcd", "-c", file.path().to_str().unwrap(), "validate"]);
        let result = execute(&cli, &ValidateArgs::default());
        assert!(result.is_err());
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command implementations for the opcd binary.

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::AppResult;

/// Dispatch the effective CLI command.
pub async fn execute(cli: &Cli) -> AppResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::execute(cli, &args).await,
        Commands::Validate(args) => validate::execute(cli, &args),
        Commands::Version => {
            println!("opcd {}", opcd_driver::VERSION);
            println!("  opcd-sdk    {}", opcd_sdk::VERSION);
            println!("  opcd-config {}", opcd_config::VERSION);
            println!("  opcd-driver {}", opcd_driver::VERSION);
            Ok(())
        }
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! opcd binary entry point.

use std::process::ExitCode;

use opcd_bin::cli::Cli;
use opcd_bin::commands;
use opcd_bin::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::execute(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

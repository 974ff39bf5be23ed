// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Validate the resolved environment against the config contract.

use clap::Args;
use colored::Colorize;
use miette::Result;

/// Validate the resolved environment
#[derive(Debug, Args)]
pub struct CmdCheck {
    #[clap(flatten)]
    resolve: crate::ResolveFlags,

    /// Exit with error when validation fails
    #[clap(long, env = "GETDOTENV_STRICT")]
    strict: bool,
}

impl CmdCheck {
    pub fn run(&mut self) -> Result<i32> {
        let resolved = self.resolve.resolve()?;

        if resolved.diagnostics.is_empty() {
            println!("{} Environment is valid", "✓".green());
            return Ok(0);
        }

        if self.strict {
            eprintln!("{}", "Error: Environment failed validation:".red());
        } else {
            println!("{}", "Warning: Environment failed validation:".yellow());
        }
        for issue in &resolved.diagnostics {
            println!("  - {issue}");
        }

        if self.strict {
            return Ok(1);
        }
        Ok(0)
    }
}

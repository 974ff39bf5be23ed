// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `getdotenv explain` command.

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

/// Explain where variables got their values
#[derive(Debug, Args)]
pub struct CmdExplain {
    #[clap(flatten)]
    resolve: crate::ResolveFlags,

    /// Print the history as JSON
    #[clap(long)]
    json: bool,

    /// Variables to explain; all touched variables when omitted
    keys: Vec<String>,
}

impl CmdExplain {
    pub fn run(&mut self) -> Result<i32> {
        let resolved = self.resolve.resolve()?;
        let keys: Vec<String> = if self.keys.is_empty() {
            resolved.provenance.keys().map(String::from).collect()
        } else {
            self.keys.clone()
        };

        if self.json {
            let mut doc = serde_json::Map::new();
            for key in &keys {
                let history = serde_json::to_value(resolved.provenance.history(key))
                    .into_diagnostic()?;
                doc.insert(
                    key.clone(),
                    serde_json::json!({
                        "value": resolved.env.get(key).cloned().flatten(),
                        "history": history,
                    }),
                );
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).into_diagnostic()?
            );
            return Ok(0);
        }

        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                println!();
            }
            let value = match resolved.env.get(key) {
                Some(Some(value)) => value.green().to_string(),
                Some(None) => "(unset)".yellow().to_string(),
                None => "(not defined)".dimmed().to_string(),
            };
            println!("{} = {}", key.cyan().bold(), value);

            let history = resolved.provenance.history(key);
            if history.is_empty() {
                println!("  {}", "(no provenance)".dimmed());
            }
            for (n, entry) in history.iter().enumerate() {
                println!("  {}. {}", n + 1, entry);
            }
        }

        Ok(0)
    }
}

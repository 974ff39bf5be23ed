// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `getdotenv show` command.

use clap::{Args, ValueEnum};
use miette::{IntoDiagnostic, Result};

#[cfg(test)]
#[path = "./cmd_show_test.rs"]
mod cmd_show_test;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ShowFormat {
    #[default]
    Dotenv,
    Json,
    Yaml,
}

/// Print the resolved environment
#[derive(Debug, Args)]
pub struct CmdShow {
    #[clap(flatten)]
    resolve: crate::ResolveFlags,

    /// Output format
    #[clap(long, value_enum, default_value_t)]
    format: ShowFormat,

    /// Include the provenance log (json and yaml only)
    #[clap(long)]
    provenance: bool,
}

impl CmdShow {
    pub fn run(&mut self) -> Result<i32> {
        let resolved = self.resolve.resolve()?;

        match self.format {
            ShowFormat::Dotenv => {
                if self.provenance {
                    tracing::warn!("--provenance is ignored for dotenv output");
                }
                for (key, value) in getdotenv::present(&resolved.env) {
                    println!("{}", dotenv_line(key, value));
                }
            }
            ShowFormat::Json => {
                let doc = self.document(&resolved)?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&doc).into_diagnostic()?
                );
            }
            ShowFormat::Yaml => {
                let doc = self.document(&resolved)?;
                print!("{}", serde_yaml::to_string(&doc).into_diagnostic()?);
            }
        }

        Ok(0)
    }

    fn document(&self, resolved: &getdotenv::ResolvedEnvironment) -> Result<serde_json::Value> {
        let env = present_map(&resolved.env);
        if !self.provenance {
            return Ok(env);
        }
        let provenance = serde_json::to_value(&resolved.provenance).into_diagnostic()?;
        Ok(serde_json::json!({
            "env": env,
            "provenance": provenance,
        }))
    }
}

/// Variables holding a value, as a JSON object in resolution order.
pub fn present_map(env: &getdotenv::Environment) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = getdotenv::present(env)
        .map(|(key, value)| (key.to_string(), serde_json::Value::from(value)))
        .collect();
    serde_json::Value::Object(map)
}

/// Format one variable as a dotenv assignment, quoting when needed.
pub fn dotenv_line(key: &str, value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value != value.trim()
        || value.contains(['#', '"', '\'', '`', '\n', '\r']);
    if !needs_quotes {
        return format!("{key}={value}");
    }
    if !value.contains(['\n', '\r']) && !value.contains('\'') {
        return format!("{key}='{value}'");
    }
    let escaped = value
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("{key}=\"{escaped}\"")
}

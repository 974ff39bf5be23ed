// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for getdotenv operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ShapeIssue;
use crate::loader::LoaderError;

/// Convenience Result type with getdotenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving an environment.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Failed to read a file that exists
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(getdotenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Invalid YAML in a config document
    #[error("Invalid YAML in config document {path:?}: {error}")]
    #[diagnostic(code(getdotenv::invalid_yaml), help("Check the YAML syntax of this file"))]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Invalid JSON in a config document
    #[error("Invalid JSON in config document {path:?}: {error}")]
    #[diagnostic(code(getdotenv::invalid_json), help("Check the JSON syntax of this file"))]
    InvalidJson {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    /// Config document parsed but does not have the expected shape
    #[error("Invalid config document {path:?}:\n{}", format_issues(issues))]
    #[diagnostic(code(getdotenv::invalid_config))]
    InvalidConfig {
        path: PathBuf,
        issues: Vec<ShapeIssue>,
    },

    /// A data-only document declares a key that needs executable semantics
    #[error("Config document {path:?} declares `{key}`, which is not supported in data formats")]
    #[diagnostic(
        code(getdotenv::unsupported_data_format_key),
        help(
            "Move `{key}` into a script-capable config such as getdotenv.config.ts or getdotenv.config.local.js"
        )
    )]
    UnsupportedDataFormatKey { path: PathBuf, key: String },

    /// The module loader could not produce a script-capable config document
    #[error("Failed to load config module {path:?}: {error}")]
    #[diagnostic(code(getdotenv::config_module_failed))]
    ConfigModuleFailed {
        path: PathBuf,
        #[source]
        error: LoaderError,
    },

    /// A dynamic source file exists but could not be evaluated
    #[error("Unable to load dynamic source '{path}': {error}")]
    #[diagnostic(
        code(getdotenv::dynamic_load_failed),
        help(
            "Script-capable dynamic sources are evaluated by a module loader; register one that can compile this file (for TypeScript this requires the optional transpiler tooling)"
        )
    )]
    DynamicLoadFailed {
        /// The path exactly as supplied by the caller.
        path: String,
        #[source]
        error: LoaderError,
    },

    /// Resolved environment failed schema or required-key checks
    #[error("Environment validation failed:\n{}", format_lines(.0))]
    #[diagnostic(
        code(getdotenv::validation_failed),
        help("Set the missing variables or run without strict validation")
    )]
    ValidationFailed(Vec<String>),
}

fn format_issues(issues: &[ShapeIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("  - {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

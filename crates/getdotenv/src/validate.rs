// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Checking a resolved environment against a config-supplied contract.
//!
//! Issues are returned as plain strings; whether they are fatal is up to
//! the caller.

use crate::config::ConfigSourceSet;
use crate::Environment;

#[cfg(test)]
#[path = "./validate_test.rs"]
mod validate_test;

/// Error raised when a schema cannot be run at all.
pub type SchemaError = Box<dyn std::error::Error + Send + Sync>;

/// One problem reported by a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Path to the offending value, e.g. `["PORT"]`.
    pub path: Vec<String>,
    pub message: Option<String>,
}

/// Result of a successful schema invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOutcome {
    Valid,
    Invalid(Vec<SchemaIssue>),
}

/// A safe-parse style validation contract.
pub trait EnvSchema: Send + Sync {
    /// Check the final environment without panicking on invalid input.
    fn safe_parse(&self, env: &Environment) -> Result<SchemaOutcome, SchemaError>;
}

impl<F> EnvSchema for F
where
    F: Fn(&Environment) -> Result<SchemaOutcome, SchemaError> + Send + Sync,
{
    fn safe_parse(&self, env: &Environment) -> Result<SchemaOutcome, SchemaError> {
        self(env)
    }
}

/// The contract selected from a config source set.
#[derive(Clone, Copy)]
pub enum ValidationContract<'a> {
    Schema(&'a dyn EnvSchema),
    RequiredKeys(&'a [String]),
}

/// Pick the contract of the highest-precedence document that declares one.
///
/// A document's `schema` wins over its own `requiredKeys`.
pub fn select_contract(sources: &ConfigSourceSet) -> Option<ValidationContract<'_>> {
    sources.iter().rev().find_map(|(_, _, doc)| {
        if let Some(schema) = &doc.schema {
            Some(ValidationContract::Schema(schema.as_ref()))
        } else {
            doc.required_keys
                .as_deref()
                .map(ValidationContract::RequiredKeys)
        }
    })
}

/// Validate `env` against the contract selected from `sources`.
pub fn validate_env(env: &Environment, sources: &ConfigSourceSet) -> Vec<String> {
    match select_contract(sources) {
        Some(contract) => check_contract(env, contract),
        None => Vec::new(),
    }
}

/// Validate `env` against one contract.
pub fn check_contract(env: &Environment, contract: ValidationContract<'_>) -> Vec<String> {
    match contract {
        ValidationContract::Schema(schema) => match schema.safe_parse(env) {
            Ok(SchemaOutcome::Valid) => Vec::new(),
            Ok(SchemaOutcome::Invalid(issues)) if issues.is_empty() => {
                vec!["Schema validation failed".to_string()]
            }
            Ok(SchemaOutcome::Invalid(issues)) => issues.iter().map(describe_issue).collect(),
            Err(err) => vec![format!("Schema validation could not run: {err}")],
        },
        ValidationContract::RequiredKeys(keys) => keys
            .iter()
            .filter(|key| !matches!(env.get(key.as_str()), Some(Some(_))))
            .map(|key| format!("Missing required environment variable: {key}"))
            .collect(),
    }
}

fn describe_issue(issue: &SchemaIssue) -> String {
    let path = issue.path.join(".");
    match (path.is_empty(), &issue.message) {
        (false, Some(message)) => format!("{path}: {message}"),
        (true, Some(message)) => message.clone(),
        (false, None) => format!("{path}: invalid value"),
        (true, None) => "Schema validation failed".to_string(),
    }
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Configuration documents (`getdotenv.config.*`) and their normalized form.
//!
//! # Example
//!
//! ```yaml
//! # getdotenv.config.yaml
//! vars:
//!   APP_NAME: demo
//!   API_URL: https://${APP_HOST:localhost}/api
//! envVars:
//!   dev:
//!     APP_HOST: dev.internal
//! requiredKeys:
//!   - APP_NAME
//! defaults:
//!   paths: ["./", "./env"]
//!   defaultEnv: dev
//! ```
//!
//! `dynamic` and `schema` need executable semantics and are only accepted
//! from script-capable documents loaded through a [`ModuleLoader`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dynamic::{DynamicLayer, DynamicMap};
use crate::loader::{ModuleExport, ModuleLoader};
use crate::provenance::{ConfigPrivacy, ConfigScope};
use crate::validate::EnvSchema;
use crate::{Environment, Error};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Base name of configuration documents.
pub const CONFIG_BASENAME: &str = "getdotenv.config";

/// Data-only extensions, in preference order.
pub const DATA_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Script-capable extensions, tried after every data extension.
pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "mts", "cts"];

/// Keys that only script-capable documents may declare.
const SCRIPT_ONLY_KEYS: &[&str] = &["dynamic", "schema"];

/// One structural problem found in a raw document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeIssue {
    /// Dotted path to the offending value; empty for the document root.
    pub path: String,
    pub message: String,
}

impl ShapeIssue {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ShapeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Resolution defaults a document may supply for options the caller left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotenv_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_dynamic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_env: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_global: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_public: Option<bool>,
}

impl ConfigDefaults {
    /// Overlay the fields `other` sets onto `self`.
    pub fn merge(&mut self, other: &ConfigDefaults) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.dotenv_token, &other.dotenv_token);
        take(&mut self.private_token, &other.private_token);
        take(&mut self.paths, &other.paths);
        take(&mut self.default_env, &other.default_env);
        take(&mut self.dynamic_path, &other.dynamic_path);
        take(&mut self.exclude_dynamic, &other.exclude_dynamic);
        take(&mut self.exclude_env, &other.exclude_env);
        take(&mut self.exclude_global, &other.exclude_global);
        take(&mut self.exclude_private, &other.exclude_private);
        take(&mut self.exclude_public, &other.exclude_public);
    }
}

/// Normalized configuration document.
#[derive(Clone, Default)]
pub struct ConfigDocument {
    /// Global overrides.
    pub vars: Environment,

    /// Overrides applied only when the named environment is selected.
    pub env_vars: IndexMap<String, Environment>,

    /// Dynamic entries (script-capable documents only).
    pub dynamic: Option<DynamicMap>,

    /// Validation contract (script-capable documents only).
    pub schema: Option<Arc<dyn EnvSchema>>,

    /// Keys that must resolve to a value.
    pub required_keys: Option<Vec<String>>,

    /// Defaults for unset resolution options.
    pub defaults: ConfigDefaults,

    /// Path to the file this was loaded from.
    pub source_path: Option<PathBuf>,
}

impl std::fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("vars", &self.vars)
            .field("env_vars", &self.env_vars)
            .field("dynamic", &self.dynamic)
            .field("schema", &self.schema.as_ref().map(|_| "<schema>"))
            .field("required_keys", &self.required_keys)
            .field("defaults", &self.defaults)
            .field("source_path", &self.source_path)
            .finish()
    }
}

/// How a config file must be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    /// Evaluated through a [`ModuleLoader`].
    Script,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ if SCRIPT_EXTENSIONS.contains(&ext) => Some(Self::Script),
            _ => None,
        }
    }
}

impl ConfigDocument {
    /// Load the document at `path`; `None` when it does not exist.
    pub fn load(path: &Path, loader: &dyn ModuleLoader) -> crate::Result<Option<Self>> {
        let Some(format) = ConfigFormat::from_path(path) else {
            tracing::debug!(path = %path.display(), "not a config document extension");
            return Ok(None);
        };

        if format == ConfigFormat::Script {
            let export = loader
                .load_default_export(path)
                .map_err(|error| Error::ConfigModuleFailed {
                    path: path.to_path_buf(),
                    error,
                })?;
            return export
                .map(|export| Self::from_module_export(export, path))
                .transpose();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(Error::ReadFailed {
                    path: path.to_path_buf(),
                    error,
                })
            }
        };

        let value = match format {
            ConfigFormat::Json => Self::parse_json(&contents, path)?,
            _ => Self::parse_yaml(&contents, path)?,
        };
        let mut doc = Self::from_data(&value, path)?;
        doc.source_path = Some(path.to_path_buf());
        Ok(Some(doc))
    }

    fn parse_json(contents: &str, path: &Path) -> crate::Result<Value> {
        serde_json::from_str(contents).map_err(|error| Error::InvalidJson {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse_yaml(contents: &str, path: &Path) -> crate::Result<Value> {
        serde_yaml::from_str(contents).map_err(|error| Error::InvalidYaml {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Build a document from a data-only source.
    ///
    /// Fails when the data declares `dynamic` or `schema`.
    pub fn from_data(value: &Value, path: &Path) -> crate::Result<Self> {
        if let Value::Object(map) = value {
            if let Some(key) = SCRIPT_ONLY_KEYS.iter().find(|key| map.contains_key(**key)) {
                return Err(Error::UnsupportedDataFormatKey {
                    path: path.to_path_buf(),
                    key: key.to_string(),
                });
            }
        }
        Self::from_raw(value, path)
    }

    /// Build a document from a module loader's export.
    pub fn from_module_export(export: ModuleExport, path: &Path) -> crate::Result<Self> {
        let mut doc = Self::from_raw(&export.data, path)?;
        doc.dynamic = export.dynamic;
        doc.schema = export.schema;
        doc.source_path = Some(path.to_path_buf());
        Ok(doc)
    }

    fn from_raw(value: &Value, path: &Path) -> crate::Result<Self> {
        let issues = check_raw_shape(value);
        if !issues.is_empty() {
            return Err(Error::InvalidConfig {
                path: path.to_path_buf(),
                issues,
            });
        }
        Ok(normalize(value))
    }

    /// The overrides for environment `env`, if the document has any.
    pub fn env_vars_for(&self, env: &str) -> Option<&Environment> {
        self.env_vars.get(env)
    }
}

/// Validate a raw document against the permissive shape.
///
/// Unknown top-level keys are allowed.
pub fn check_raw_shape(value: &Value) -> Vec<ShapeIssue> {
    let mut issues = Vec::new();
    let map = match value {
        Value::Null => return issues,
        Value::Object(map) => map,
        other => {
            issues.push(ShapeIssue::new(
                "",
                format!("expected an object, found {}", type_name(other)),
            ));
            return issues;
        }
    };

    if let Some(vars) = map.get("vars") {
        check_var_map(vars, "vars", &mut issues);
    }

    if let Some(env_vars) = map.get("envVars") {
        match env_vars {
            Value::Object(envs) => {
                for (env, vars) in envs {
                    check_var_map(vars, &format!("envVars.{env}"), &mut issues);
                }
            }
            Value::Null => {}
            other => issues.push(ShapeIssue::new(
                "envVars",
                format!("expected an object, found {}", type_name(other)),
            )),
        }
    }

    if let Some(required) = map.get("requiredKeys") {
        match required {
            Value::Array(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    if !key.is_string() {
                        issues.push(ShapeIssue::new(
                            format!("requiredKeys.{i}"),
                            format!("expected a string, found {}", type_name(key)),
                        ));
                    }
                }
            }
            Value::Null => {}
            other => issues.push(ShapeIssue::new(
                "requiredKeys",
                format!("expected an array, found {}", type_name(other)),
            )),
        }
    }

    if let Some(defaults) = map.get("defaults") {
        if let Err(err) = ConfigDefaults::deserialize(defaults) {
            issues.push(ShapeIssue::new("defaults", err.to_string()));
        }
    }

    issues
}

fn check_var_map(value: &Value, path: &str, issues: &mut Vec<ShapeIssue>) {
    match value {
        Value::Object(vars) => {
            for (key, var) in vars {
                if matches!(var, Value::Array(_) | Value::Object(_)) {
                    issues.push(ShapeIssue::new(
                        format!("{path}.{key}"),
                        format!("expected a string, found {}", type_name(var)),
                    ));
                }
            }
        }
        Value::Null => {}
        other => issues.push(ShapeIssue::new(
            path,
            format!("expected an object, found {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a shape-checked raw document, applying field defaults.
fn normalize(value: &Value) -> ConfigDocument {
    let mut doc = ConfigDocument::default();
    let Value::Object(map) = value else {
        return doc;
    };

    if let Some(vars) = map.get("vars") {
        doc.vars = var_map(vars);
    }
    if let Some(Value::Object(envs)) = map.get("envVars") {
        doc.env_vars = envs
            .iter()
            .map(|(env, vars)| (env.clone(), var_map(vars)))
            .collect();
    }
    if let Some(Value::Array(keys)) = map.get("requiredKeys") {
        doc.required_keys = Some(
            keys.iter()
                .filter_map(|key| key.as_str().map(String::from))
                .collect(),
        );
    }
    if let Some(defaults) = map.get("defaults") {
        doc.defaults = ConfigDefaults::deserialize(defaults).unwrap_or_default();
    }
    doc
}

fn var_map(value: &Value) -> Environment {
    let Value::Object(vars) = value else {
        return Environment::new();
    };
    vars.iter()
        .map(|(key, var)| {
            let value = match var {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            };
            (key.clone(), value)
        })
        .collect()
}

/// Up to one document per (scope, privacy) pair.
#[derive(Debug, Clone, Default)]
pub struct ConfigSourceSet {
    pub packaged: Option<ConfigDocument>,
    pub project_public: Option<ConfigDocument>,
    pub project_local: Option<ConfigDocument>,
}

impl ConfigSourceSet {
    /// Present documents, lowest precedence first.
    pub fn iter(
        &self,
    ) -> impl DoubleEndedIterator<Item = (ConfigScope, ConfigPrivacy, &ConfigDocument)> {
        [
            (ConfigScope::Packaged, ConfigPrivacy::Public, &self.packaged),
            (ConfigScope::Project, ConfigPrivacy::Public, &self.project_public),
            (ConfigScope::Project, ConfigPrivacy::Local, &self.project_local),
        ]
        .into_iter()
        .filter_map(|(scope, privacy, doc)| doc.as_ref().map(|doc| (scope, privacy, doc)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Defaults merged across documents, higher precedence winning per field.
    pub fn defaults(&self) -> ConfigDefaults {
        let mut merged = ConfigDefaults::default();
        for (_, _, doc) in self.iter() {
            merged.merge(&doc.defaults);
        }
        merged
    }

    /// One `config` dynamic layer per document that declares `dynamic`.
    pub fn dynamic_layers(&self) -> Vec<DynamicLayer> {
        self.iter()
            .filter_map(|(_, _, doc)| doc.dynamic.clone().map(DynamicLayer::config))
            .collect()
    }
}

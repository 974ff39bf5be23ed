// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Per-key history of every write made while resolving an environment.
//!
//! The log never stores values, only descriptors of the operations that
//! produced them. Entries for a key are kept in the order layers were
//! applied, so the last entry always describes the effective value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./provenance_test.rs"]
mod provenance_test;

/// Whether a write assigned a value or cleared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Set,
    Unset,
}

impl Op {
    /// `Set` when a value is present, `Unset` otherwise.
    pub fn for_value(value: Option<&str>) -> Self {
        match value {
            Some(_) => Self::Set,
            None => Self::Unset,
        }
    }
}

/// Global entries versus entries selected by environment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Env,
}

/// Privacy of the file or document a write came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    Public,
    Private,
}

/// Where a configuration document was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// Shipped with the tool.
    Packaged,
    /// Found relative to the invoking project.
    Project,
}

/// Privacy level of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigPrivacy {
    Public,
    Local,
}

impl std::fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Packaged => f.write_str("packaged"),
            Self::Project => f.write_str("project"),
        }
    }
}

impl std::fmt::Display for ConfigPrivacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Local => f.write_str("local"),
        }
    }
}

impl From<ConfigPrivacy> for Privacy {
    fn from(privacy: ConfigPrivacy) -> Self {
        match privacy {
            ConfigPrivacy::Public => Privacy::Public,
            ConfigPrivacy::Local => Privacy::Private,
        }
    }
}

/// Dynamic tiers in ascending precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DynamicSource {
    Config,
    Programmatic,
    DynamicPath,
}

impl std::fmt::Display for DynamicSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => f.write_str("config"),
            Self::Programmatic => f.write_str("programmatic"),
            Self::DynamicPath => f.write_str("dynamicPath"),
        }
    }
}

/// One write to one key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProvenanceEntry {
    /// Read from a dotenv file in the cascade.
    #[serde(rename_all = "camelCase")]
    File {
        op: Op,
        scope: Scope,
        privacy: Privacy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<String>,
        /// Search-path entry exactly as supplied by the caller.
        path: String,
        /// Composed filename, e.g. `.env.dev.local`.
        file: String,
    },

    /// Applied from a configuration document's `vars` or `envVars`.
    #[serde(rename_all = "camelCase")]
    Config {
        op: Op,
        scope: Scope,
        privacy: Privacy,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<String>,
        config_scope: ConfigScope,
        config_privacy: ConfigPrivacy,
    },

    /// Explicitly supplied override.
    Vars { op: Op },

    /// Produced by a dynamic map entry.
    #[serde(rename_all = "camelCase")]
    Dynamic {
        op: Op,
        dynamic_source: DynamicSource,
        /// Only for the `dynamicPath` tier, exactly as supplied.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dynamic_path: Option<String>,
    },
}

impl ProvenanceEntry {
    pub fn op(&self) -> Op {
        match self {
            Self::File { op, .. }
            | Self::Config { op, .. }
            | Self::Vars { op }
            | Self::Dynamic { op, .. } => *op,
        }
    }

    /// The tier name: `file`, `config`, `vars` or `dynamic`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Config { .. } => "config",
            Self::Vars { .. } => "vars",
            Self::Dynamic { .. } => "dynamic",
        }
    }
}

impl std::fmt::Display for ProvenanceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self.op() {
            Op::Set => "set",
            Op::Unset => "unset",
        };
        match self {
            Self::File { path, file, .. } => write!(f, "{op} by file {path}/{file}"),
            Self::Config {
                scope,
                env,
                config_scope,
                config_privacy,
                ..
            } => {
                write!(f, "{op} by {config_scope}/{config_privacy} config")?;
                match (scope, env) {
                    (Scope::Env, Some(env)) => write!(f, " (envVars.{env})"),
                    _ => write!(f, " (vars)"),
                }
            }
            Self::Vars { .. } => write!(f, "{op} by explicit vars"),
            Self::Dynamic {
                dynamic_source,
                dynamic_path,
                ..
            } => {
                write!(f, "{op} by {dynamic_source} dynamic")?;
                if let Some(path) = dynamic_path {
                    write!(f, " ({path})")?;
                }
                Ok(())
            }
        }
    }
}

/// Ordered, append-only provenance for every key touched by a resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProvenanceLog {
    entries: IndexMap<String, Vec<ProvenanceEntry>>,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry to the end of a key's history.
    pub fn record(&mut self, key: impl Into<String>, entry: ProvenanceEntry) {
        let key = key.into();
        tracing::trace!(%key, %entry, "provenance");
        self.entries.entry(key).or_default().push(entry);
    }

    /// Every entry for `key`, lowest precedence first.
    pub fn history(&self, key: &str) -> &[ProvenanceEntry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// The entry describing the effective value of `key`, if any.
    pub fn last(&self, key: &str) -> Option<&ProvenanceEntry> {
        self.history(key).last()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ProvenanceEntry])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of keys with at least one entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

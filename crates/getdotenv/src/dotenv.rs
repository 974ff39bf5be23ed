// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Reading the cascade of dotenv files from a list of search paths.
//!
//! For every search path up to four files are visited, in this order:
//!
//! | category       | filename                     |
//! |----------------|------------------------------|
//! | global public  | `<token>`                    |
//! | env public     | `<token>.<env>`              |
//! | global private | `<token>.<private>`          |
//! | env private    | `<token>.<env>.<private>`    |
//!
//! Later files override earlier ones and later paths override earlier
//! paths. Missing files are skipped.

use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::expand::{ExpandMode, Expander};
use crate::provenance::{Op, Privacy, ProvenanceEntry, ProvenanceLog, Scope};
use crate::{Environment, Error};

#[cfg(test)]
#[path = "./dotenv_test.rs"]
mod dotenv_test;

/// Default base filename token.
pub const DEFAULT_DOTENV_TOKEN: &str = ".env";

/// Default suffix token for private files.
pub const DEFAULT_PRIVATE_TOKEN: &str = "local";

/// Options for [`read_dotenv_cascade`].
#[derive(Debug, Clone)]
pub struct CascadeOptions {
    /// Base filename token, e.g. `.env`.
    pub dotenv_token: String,

    /// Suffix token marking private files, e.g. `local`.
    pub private_token: String,

    /// Search paths, lowest precedence first. Recorded verbatim in provenance.
    pub paths: Vec<String>,

    /// Selected environment name.
    pub env: Option<String>,

    pub exclude_public: bool,
    pub exclude_private: bool,
    pub exclude_global: bool,
    pub exclude_env: bool,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            dotenv_token: DEFAULT_DOTENV_TOKEN.to_string(),
            private_token: DEFAULT_PRIVATE_TOKEN.to_string(),
            paths: vec!["./".to_string()],
            env: None,
            exclude_public: false,
            exclude_private: false,
            exclude_global: false,
            exclude_env: false,
        }
    }
}

impl CascadeOptions {
    /// The (scope, privacy) categories visited for each path, in order.
    fn categories(&self) -> Vec<(Scope, Privacy)> {
        [
            (Scope::Global, Privacy::Public),
            (Scope::Env, Privacy::Public),
            (Scope::Global, Privacy::Private),
            (Scope::Env, Privacy::Private),
        ]
        .into_iter()
        .filter(|(scope, privacy)| {
            let scope_enabled = match scope {
                Scope::Global => !self.exclude_global,
                Scope::Env => !self.exclude_env && self.env.is_some(),
            };
            let privacy_enabled = match privacy {
                Privacy::Public => !self.exclude_public,
                Privacy::Private => !self.exclude_private,
            };
            scope_enabled && privacy_enabled
        })
        .collect()
    }

    fn filename(&self, scope: Scope, privacy: Privacy) -> String {
        let env = match scope {
            Scope::Global => None,
            Scope::Env => self.env.as_deref(),
        };
        let private = match privacy {
            Privacy::Public => None,
            Privacy::Private => Some(self.private_token.as_str()),
        };
        dotenv_filename(&self.dotenv_token, env, private)
    }
}

/// Compose `token[.env][.private]`.
pub fn dotenv_filename(token: &str, env: Option<&str>, private_token: Option<&str>) -> String {
    let mut name = token.to_string();
    for part in [env, private_token].into_iter().flatten() {
        name.push('.');
        name.push_str(part);
    }
    name
}

/// A file-tier write waiting for the final expansion to decide its op.
struct PendingWrite {
    key: String,
    scope: Scope,
    privacy: Privacy,
    path: String,
    file: String,
}

/// Read and merge the dotenv cascade, then expand it progressively.
///
/// Every key found in a file gets a `file` entry in `log`. The last such
/// entry for a key whose expanded value is empty is recorded as an unset.
pub fn read_dotenv_cascade(
    options: &CascadeOptions,
    expander: &Expander<'_>,
    log: &mut ProvenanceLog,
) -> crate::Result<Environment> {
    let categories = options.categories();
    let mut merged = Environment::new();
    let mut pending = Vec::new();

    for search_path in &options.paths {
        for &(scope, privacy) in &categories {
            let filename = options.filename(scope, privacy);
            let file_path = Path::new(search_path).join(&filename);

            let Some(parsed) = read_dotenv_file(&file_path)? else {
                tracing::trace!(path = %file_path.display(), "no dotenv file");
                continue;
            };
            tracing::debug!(
                path = %file_path.display(),
                keys = parsed.len(),
                "read dotenv file"
            );

            for (key, value) in parsed {
                pending.push(PendingWrite {
                    key: key.clone(),
                    scope,
                    privacy,
                    path: search_path.clone(),
                    file: filename.clone(),
                });
                merged.insert(key, value);
            }
        }
    }

    let expanded = expander.expand_all(&merged, &Environment::new(), ExpandMode::Progressive);

    let last_write: IndexMap<&str, usize> = pending
        .iter()
        .enumerate()
        .map(|(i, write)| (write.key.as_str(), i))
        .collect();

    for (i, write) in pending.iter().enumerate() {
        let is_last = last_write.get(write.key.as_str()) == Some(&i);
        let op = match expanded.get(&write.key) {
            Some(None) if is_last => Op::Unset,
            _ => Op::Set,
        };
        log.record(
            write.key.clone(),
            ProvenanceEntry::File {
                op,
                scope: write.scope,
                privacy: write.privacy,
                env: match write.scope {
                    Scope::Env => options.env.clone(),
                    Scope::Global => None,
                },
                path: write.path.clone(),
                file: write.file.clone(),
            },
        );
    }

    Ok(expanded)
}

/// Read and parse one dotenv file; `None` when it does not exist.
pub fn read_dotenv_file(path: &Path) -> crate::Result<Option<Environment>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_dotenv(&contents))),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        }),
    }
}

static LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^\s*(?:export\s+)?([\w.-]+)(?:\s*=\s*?|:\s+?)(\s*'(?:\\'|[^'])*'|\s*"(?:\\"|[^"])*"|\s*`(?:\\`|[^`])*`|[^#\r\n]+)?\s*(?:#.*)?$"#,
    )
    .expect("dotenv line pattern is valid")
});

/// Parse dotenv source into raw, unexpanded values.
///
/// Lines that do not look like assignments are ignored.
pub fn parse_dotenv(src: &str) -> Environment {
    let src = src.replace("\r\n", "\n").replace('\r', "\n");
    let mut parsed = Environment::new();

    for caps in LINE.captures_iter(&src) {
        let key = caps[1].to_string();
        let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default().trim();

        let quote = raw.chars().next().filter(|c| matches!(c, '\'' | '"' | '`'));
        let value = match quote {
            Some(q) if raw.len() >= 2 && raw.ends_with(q) => {
                let inner = &raw[1..raw.len() - 1];
                if q == '"' {
                    inner.replace("\\n", "\n").replace("\\r", "\r")
                } else {
                    inner.to_string()
                }
            }
            _ => raw.to_string(),
        };

        parsed.insert(key, Some(value));
    }

    parsed
}

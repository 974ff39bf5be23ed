// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Dotenv-style `$NAME` / `${NAME}` interpolation.
//!
//! ## Syntax
//!
//! - `$NAME`, `${NAME}` - value of `NAME` from the reference environment,
//!   falling back to the ambient (process) environment.
//! - `${NAME:default}`, `${NAME:-default}` - as above, or `default` when `NAME`
//!   resolves to nothing.
//! - `\$` - a literal `$`, never substituted.
//!
//! Unknown names expand to the empty string, and an expansion whose final
//! text is empty yields `None`.

use std::collections::HashMap;

use crate::Environment;

#[cfg(test)]
#[path = "./expand_test.rs"]
mod expand_test;

/// Lookup of variables that are not defined by the reference environment.
pub trait AmbientEnv {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessAmbient;

impl AmbientEnv for ProcessAmbient {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An ambient environment that defines nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAmbient;

impl AmbientEnv for NoAmbient {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

impl AmbientEnv for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// How a batch of values sees its siblings during [`Expander::expand_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpandMode {
    /// Each key can reference the already-expanded keys before it in the batch.
    #[default]
    Progressive,
    /// Every key expands only against the supplied reference environment.
    NonProgressive,
}

/// Interpolates values against a reference environment plus an ambient fallback.
#[derive(Clone, Copy)]
pub struct Expander<'a> {
    ambient: &'a dyn AmbientEnv,
}

impl Default for Expander<'static> {
    fn default() -> Self {
        Self {
            ambient: &ProcessAmbient,
        }
    }
}

impl std::fmt::Debug for Expander<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expander").finish_non_exhaustive()
    }
}

impl<'a> Expander<'a> {
    /// Create an expander with the given ambient fallback.
    pub fn new(ambient: &'a dyn AmbientEnv) -> Self {
        Self { ambient }
    }

    /// Expand a single value against `reference`.
    pub fn expand(&self, value: &str, reference: &Environment) -> Option<String> {
        self.expand_in(value, &[reference])
    }

    /// Expand every value of a batch, preserving insertion order.
    ///
    /// `None` inputs stay `None` without being interpolated.
    pub fn expand_all(
        &self,
        values: &Environment,
        reference: &Environment,
        mode: ExpandMode,
    ) -> Environment {
        let mut expanded = Environment::with_capacity(values.len());
        for (key, value) in values {
            let result = match (value, mode) {
                (None, _) => None,
                (Some(v), ExpandMode::Progressive) => self.expand_in(v, &[&expanded, reference]),
                (Some(v), ExpandMode::NonProgressive) => self.expand_in(v, &[reference]),
            };
            expanded.insert(key.clone(), result);
        }
        expanded
    }

    fn expand_in(&self, value: &str, scopes: &[&Environment]) -> Option<String> {
        let result = self.interpolate(value, scopes);
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// First scope that mentions `name` wins, even when it holds an unset.
    fn lookup(&self, name: &str, scopes: &[&Environment]) -> Option<String> {
        for scope in scopes {
            if let Some(entry) = scope.get(name) {
                return entry.clone();
            }
        }
        self.ambient.get(name)
    }

    fn interpolate(&self, value: &str, scopes: &[&Environment]) -> String {
        if !value.contains('$') {
            return value.to_string();
        }

        let mut result = String::with_capacity(value.len());
        let mut i = 0;
        while i < value.len() {
            let rest = &value[i..];

            if rest.starts_with("\\$") {
                result.push('$');
                i += 2;
                continue;
            }

            if let Some(braced) = rest.strip_prefix("${") {
                let Some(close) = braced.find('}') else {
                    // Unclosed, keep the remainder verbatim
                    result.push_str(rest);
                    break;
                };
                let inner = &braced[..close];
                let (name, default) = match inner.split_once(':') {
                    // `${NAME:-default}` and `${NAME:default}` are equivalent
                    Some((name, default)) => {
                        (name, Some(default.strip_prefix('-').unwrap_or(default)))
                    }
                    None => (inner, None),
                };
                match self.lookup(name, scopes) {
                    Some(found) => result.push_str(&found),
                    None => {
                        if let Some(default) = default {
                            result.push_str(&self.interpolate(default, scopes));
                        }
                    }
                }
                i += 2 + close + 1;
                continue;
            }

            if let Some(after) = rest.strip_prefix('$') {
                let name_len = after
                    .bytes()
                    .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                    .count();
                if name_len > 0 {
                    if let Some(found) = self.lookup(&after[..name_len], scopes) {
                        result.push_str(&found);
                    }
                    i += 1 + name_len;
                } else {
                    result.push('$');
                    i += 1;
                }
                continue;
            }

            let Some(ch) = rest.chars().next() else {
                break;
            };
            result.push(ch);
            i += ch.len_utf8();
        }
        result
    }
}

/// Expand one value against `reference`, falling back to the process environment.
pub fn dotenv_expand(value: &str, reference: &Environment) -> Option<String> {
    Expander::default().expand(value, reference)
}

/// Expand a batch against `reference`, falling back to the process environment.
pub fn dotenv_expand_all(
    values: &Environment,
    reference: &Environment,
    mode: ExpandMode,
) -> Environment {
    Expander::default().expand_all(values, reference, mode)
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Parsing explicit overrides supplied as a single string.

use crate::Environment;

#[cfg(test)]
#[path = "./vars_test.rs"]
mod vars_test;

/// Default separator between a key and its value.
pub const DEFAULT_VARS_ASSIGNOR: &str = "=";

/// Default separator between assignments.
pub const DEFAULT_VARS_DELIMITER: &str = " ";

/// Parse `KEY=value KEY2=value2` style overrides.
///
/// Assignments without an assignor and blank segments are ignored. A key
/// with an empty value is kept and later expands to an unset.
pub fn parse_vars(input: &str, assignor: &str, delimiter: &str) -> Environment {
    let mut vars = Environment::new();
    for segment in input.split(delimiter) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once(assignor) else {
            tracing::debug!(segment, "ignoring vars segment without assignor");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), Some(value.to_string()));
    }
    vars
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The resolved variable map shared by every resolution stage.

use indexmap::IndexMap;

/// Variable name to value, in first-observed order.
///
/// `None` is an explicit unset: keys are never removed once a layer has
/// touched them so that provenance can record the `unset` operation.
pub type Environment = IndexMap<String, Option<String>>;

/// Build an environment from plain string pairs.
pub fn env_from_pairs<I, K, V>(pairs: I) -> Environment
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Some(v.into())))
        .collect()
}

/// Iterate only the variables that currently hold a value.
pub fn present(env: &Environment) -> impl Iterator<Item = (&str, &str)> {
    env.iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
}

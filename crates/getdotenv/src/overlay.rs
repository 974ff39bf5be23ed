// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Layering configuration and explicit values over a base environment.

use crate::config::ConfigSourceSet;
use crate::expand::{ExpandMode, Expander};
use crate::provenance::{Op, Privacy, ProvenanceEntry, ProvenanceLog, Scope};
use crate::Environment;

#[cfg(test)]
#[path = "./overlay_test.rs"]
mod overlay_test;

/// Overlay `sources` and then explicit `vars` onto `base`.
///
/// Layers are applied lowest precedence first:
///
/// 1. packaged public: `vars`, then `envVars[selected_env]`
/// 2. project public: `vars`, then `envVars[selected_env]`
/// 3. project local: `vars`, then `envVars[selected_env]`
/// 4. explicit `vars`
///
/// Each layer is expanded progressively against everything applied before
/// it, and every key a layer writes gets one entry in `log`.
pub fn overlay_env(
    base: &Environment,
    selected_env: Option<&str>,
    sources: &ConfigSourceSet,
    vars: Option<&Environment>,
    expander: &Expander<'_>,
    log: &mut ProvenanceLog,
) -> Environment {
    let mut env = base.clone();

    for (config_scope, config_privacy, doc) in sources.iter() {
        let privacy = Privacy::from(config_privacy);

        apply_layer(&mut env, &doc.vars, expander, log, |op| {
            ProvenanceEntry::Config {
                op,
                scope: Scope::Global,
                privacy,
                env: None,
                config_scope,
                config_privacy,
            }
        });

        let Some(selected) = selected_env else {
            continue;
        };
        if let Some(env_vars) = doc.env_vars_for(selected) {
            apply_layer(&mut env, env_vars, expander, log, |op| {
                ProvenanceEntry::Config {
                    op,
                    scope: Scope::Env,
                    privacy,
                    env: Some(selected.to_string()),
                    config_scope,
                    config_privacy,
                }
            });
        }
    }

    if let Some(vars) = vars {
        apply_layer(&mut env, vars, expander, log, |op| ProvenanceEntry::Vars { op });
    }

    env
}

fn apply_layer<F>(
    env: &mut Environment,
    values: &Environment,
    expander: &Expander<'_>,
    log: &mut ProvenanceLog,
    entry: F,
) where
    F: Fn(Op) -> ProvenanceEntry,
{
    if values.is_empty() {
        return;
    }
    // Unset inputs pass through expand_all untouched
    let expanded = expander.expand_all(values, env, ExpandMode::Progressive);
    for (key, value) in expanded {
        log.record(key.clone(), entry(Op::for_value(value.as_deref())));
        env.insert(key, value);
    }
}

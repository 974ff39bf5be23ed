// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end resolution: config discovery, dotenv cascade, overlay,
//! dynamic tiers and validation.

use crate::config::ConfigSourceSet;
use crate::discovery::{discover_config_sources, DiscoveryOptions};
use crate::dotenv::{read_dotenv_cascade, CascadeOptions, DEFAULT_DOTENV_TOKEN, DEFAULT_PRIVATE_TOKEN};
use crate::dynamic::{apply_dynamic, load_dynamic_path, DynamicLayer, DynamicMap};
use crate::expand::Expander;
use crate::loader::ModuleLoader;
use crate::overlay::overlay_env;
use crate::provenance::ProvenanceLog;
use crate::validate::validate_env;
use crate::{Environment, Error};

#[cfg(test)]
#[path = "./resolve_test.rs"]
mod resolve_test;

/// Options for [`resolve_dotenv`].
///
/// Options left as `None` fall back to the `defaults` block of the
/// discovered config documents, then to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Selected environment name.
    pub env: Option<String>,

    /// Environment name used when `env` is not given.
    pub default_env: Option<String>,

    /// Dotenv base filename token (built-in: `.env`).
    pub dotenv_token: Option<String>,

    /// Private file suffix token (built-in: `local`).
    pub private_token: Option<String>,

    /// Dotenv search paths (built-in: `./`). Recorded verbatim in provenance.
    pub paths: Option<Vec<String>>,

    pub exclude_dynamic: Option<bool>,
    pub exclude_env: Option<bool>,
    pub exclude_global: Option<bool>,
    pub exclude_private: Option<bool>,
    pub exclude_public: Option<bool>,

    /// Explicit overrides, the highest static tier.
    pub vars: Option<Environment>,

    /// Programmatic dynamic entries.
    pub dynamic: Option<DynamicMap>,

    /// Script-capable dynamic source, the highest tier.
    pub dynamic_path: Option<String>,

    /// Do not look for config documents at all.
    pub skip_config_discovery: bool,

    /// Where to look for config documents.
    pub discovery: DiscoveryOptions,

    /// Fail with [`Error::ValidationFailed`] instead of logging issues.
    pub strict: bool,
}

/// The outcome of one resolution run.
#[derive(Debug, Clone)]
pub struct ResolvedEnvironment {
    pub env: Environment,
    pub provenance: ProvenanceLog,
    /// Validation issues; empty when valid or when no contract was declared.
    pub diagnostics: Vec<String>,
    pub selected_env: Option<String>,
    pub sources: ConfigSourceSet,
}

/// Resolve an environment, falling back to the process environment during expansion.
pub fn resolve_dotenv(
    options: &ResolveOptions,
    loader: &dyn ModuleLoader,
) -> crate::Result<ResolvedEnvironment> {
    resolve_dotenv_with(options, loader, &Expander::default())
}

/// Resolve an environment with an explicit expander.
pub fn resolve_dotenv_with(
    options: &ResolveOptions,
    loader: &dyn ModuleLoader,
    expander: &Expander<'_>,
) -> crate::Result<ResolvedEnvironment> {
    let sources = if options.skip_config_discovery {
        ConfigSourceSet::default()
    } else {
        discover_config_sources(&options.discovery, loader)?
    };
    let defaults = sources.defaults();

    let selected_env = options
        .env
        .clone()
        .or_else(|| options.default_env.clone())
        .or_else(|| defaults.default_env.clone());

    let cascade = CascadeOptions {
        dotenv_token: options
            .dotenv_token
            .clone()
            .or_else(|| defaults.dotenv_token.clone())
            .unwrap_or_else(|| DEFAULT_DOTENV_TOKEN.to_string()),
        private_token: options
            .private_token
            .clone()
            .or_else(|| defaults.private_token.clone())
            .unwrap_or_else(|| DEFAULT_PRIVATE_TOKEN.to_string()),
        paths: options
            .paths
            .clone()
            .or_else(|| defaults.paths.clone())
            .unwrap_or_else(|| vec!["./".to_string()]),
        env: selected_env.clone(),
        exclude_public: flag(options.exclude_public, defaults.exclude_public),
        exclude_private: flag(options.exclude_private, defaults.exclude_private),
        exclude_global: flag(options.exclude_global, defaults.exclude_global),
        exclude_env: flag(options.exclude_env, defaults.exclude_env),
    };
    tracing::debug!(env = ?selected_env, paths = ?cascade.paths, "resolving environment");

    let mut provenance = ProvenanceLog::new();
    let base = read_dotenv_cascade(&cascade, expander, &mut provenance)?;
    let mut env = overlay_env(
        &base,
        selected_env.as_deref(),
        &sources,
        options.vars.as_ref(),
        expander,
        &mut provenance,
    );

    if !flag(options.exclude_dynamic, defaults.exclude_dynamic) {
        let mut layers = sources.dynamic_layers();
        if let Some(dynamic) = &options.dynamic {
            layers.push(DynamicLayer::programmatic(dynamic.clone()));
        }
        let dynamic_path = options
            .dynamic_path
            .as_ref()
            .or(defaults.dynamic_path.as_ref());
        if let Some(path) = dynamic_path {
            layers.extend(load_dynamic_path(path, loader)?);
        }
        env = apply_dynamic(&env, selected_env.as_deref(), &layers, &mut provenance);
    }

    let diagnostics = validate_env(&env, &sources);
    if !diagnostics.is_empty() {
        if options.strict {
            return Err(Error::ValidationFailed(diagnostics));
        }
        for issue in &diagnostics {
            tracing::warn!("{issue}");
        }
    }

    Ok(ResolvedEnvironment {
        env,
        provenance,
        diagnostics,
        selected_env,
        sources,
    })
}

fn flag(option: Option<bool>, default: Option<bool>) -> bool {
    option.or(default).unwrap_or(false)
}

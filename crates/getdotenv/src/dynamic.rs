// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Procedurally computed variables applied after every static tier.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::loader::ModuleLoader;
use crate::provenance::{DynamicSource, Op, ProvenanceEntry, ProvenanceLog};
use crate::{Environment, Error};

#[cfg(test)]
#[path = "./dynamic_test.rs"]
mod dynamic_test;

/// A function of the environment built so far and the selected environment name.
pub type DynamicFn = Arc<dyn Fn(&Environment, Option<&str>) -> Option<String> + Send + Sync>;

/// One dynamic entry: a literal or a computed value.
#[derive(Clone)]
pub enum DynamicValue {
    /// Applied as-is; `None` unsets the key.
    Literal(Option<String>),
    /// Invoked in place against the environment built so far.
    Computed(DynamicFn),
}

impl std::fmt::Debug for DynamicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(<fn>)"),
        }
    }
}

impl DynamicValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Some(value.into()))
    }

    pub fn unset() -> Self {
        Self::Literal(None)
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Environment, Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    fn evaluate(&self, env: &Environment, selected_env: Option<&str>) -> Option<String> {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(f) => f(env, selected_env),
        }
    }
}

/// Dynamic entries in application order.
pub type DynamicMap = IndexMap<String, DynamicValue>;

/// A dynamic map attributed to one tier.
#[derive(Debug, Clone)]
pub struct DynamicLayer {
    pub source: DynamicSource,
    pub entries: DynamicMap,
    /// Path as supplied by the caller, only for [`DynamicSource::DynamicPath`].
    pub path: Option<String>,
}

impl DynamicLayer {
    pub fn config(entries: DynamicMap) -> Self {
        Self {
            source: DynamicSource::Config,
            entries,
            path: None,
        }
    }

    pub fn programmatic(entries: DynamicMap) -> Self {
        Self {
            source: DynamicSource::Programmatic,
            entries,
            path: None,
        }
    }

    pub fn dynamic_path(path: impl Into<String>, entries: DynamicMap) -> Self {
        Self {
            source: DynamicSource::DynamicPath,
            entries,
            path: Some(path.into()),
        }
    }
}

/// Apply dynamic layers on top of `env`.
///
/// Layers run in tier order (`config`, `programmatic`, `dynamicPath`) no
/// matter how they are passed; layers of the same tier keep their relative
/// order. Every entry sees the environment produced by all entries before it.
pub fn apply_dynamic(
    env: &Environment,
    selected_env: Option<&str>,
    layers: &[DynamicLayer],
    log: &mut ProvenanceLog,
) -> Environment {
    let mut ordered: Vec<&DynamicLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.source);

    let mut env = env.clone();
    for layer in ordered {
        let dynamic_path = match layer.source {
            DynamicSource::DynamicPath => layer.path.clone(),
            _ => None,
        };
        for (key, value) in &layer.entries {
            let produced = value.evaluate(&env, selected_env);
            log.record(
                key.clone(),
                ProvenanceEntry::Dynamic {
                    op: Op::for_value(produced.as_deref()),
                    dynamic_source: layer.source,
                    dynamic_path: dynamic_path.clone(),
                },
            );
            env.insert(key.clone(), produced);
        }
    }
    env
}

/// Load the dynamic map exported by the module at `path`.
///
/// A path that does not exist yields `None`. A module that exists but
/// cannot be evaluated fails the resolution.
pub fn load_dynamic_path(
    path: &str,
    loader: &dyn ModuleLoader,
) -> crate::Result<Option<DynamicLayer>> {
    let file = Path::new(path);
    if !file.exists() {
        tracing::debug!(path, "dynamic source not found");
        return Ok(None);
    }

    match loader.load_default_export(file) {
        Ok(Some(export)) => Ok(Some(DynamicLayer::dynamic_path(
            path,
            export.dynamic.unwrap_or_default(),
        ))),
        Ok(None) => Ok(None),
        Err(error) => Err(Error::DynamicLoadFailed {
            path: path.to_string(),
            error,
        }),
    }
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The seam through which script-capable sources are evaluated.
//!
//! Config documents and dynamic sources written in an executable format
//! (`getdotenv.config.ts`, `dynamic.js`, ...) are never interpreted by this
//! crate. A [`ModuleLoader`] hands back their default export instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dynamic::DynamicMap;
use crate::validate::EnvSchema;

/// Error produced by a module loader.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync>;

/// The default export of a script-capable source.
#[derive(Clone, Default)]
pub struct ModuleExport {
    /// Plain-data portion of the export (`vars`, `envVars`, `requiredKeys`, ...).
    pub data: serde_json::Value,

    /// Dynamic entries. For a dynamic source file this is the whole export.
    pub dynamic: Option<DynamicMap>,

    /// Validation contract, only meaningful for config documents.
    pub schema: Option<Arc<dyn EnvSchema>>,
}

impl std::fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleExport")
            .field("data", &self.data)
            .field("dynamic", &self.dynamic)
            .field("schema", &self.schema.as_ref().map(|_| "<schema>"))
            .finish()
    }
}

impl ModuleExport {
    /// An export holding only data.
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    /// An export holding only dynamic entries.
    pub fn dynamic(dynamic: DynamicMap) -> Self {
        Self {
            dynamic: Some(dynamic),
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Arc<dyn EnvSchema>) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Obtains the default export of a script-capable source file.
pub trait ModuleLoader {
    /// Load the module at `path`.
    ///
    /// A missing file is `Ok(None)`, never an error.
    fn load_default_export(&self, path: &Path) -> Result<Option<ModuleExport>, LoaderError>;
}

/// A loader for hosts that cannot evaluate script-capable sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoModuleLoader;

impl ModuleLoader for NoModuleLoader {
    fn load_default_export(&self, path: &Path) -> Result<Option<ModuleExport>, LoaderError> {
        if !path.exists() {
            return Ok(None);
        }
        Err(format!(
            "no module loader is registered to evaluate {}",
            path.display()
        )
        .into())
    }
}

/// A registry of exports supplied by the host, keyed by module path.
///
/// Lets Rust programs provide the equivalent of a script-capable config or
/// dynamic source without evaluating any foreign code.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleLoader {
    exports: HashMap<PathBuf, ModuleExport>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the export returned for `path`.
    pub fn register<P: AsRef<Path>>(&mut self, path: P, export: ModuleExport) {
        self.exports.insert(normalize(path.as_ref()), export);
    }

    pub fn with_export<P: AsRef<Path>>(mut self, path: P, export: ModuleExport) -> Self {
        self.register(path, export);
        self
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load_default_export(&self, path: &Path) -> Result<Option<ModuleExport>, LoaderError> {
        if let Some(export) = self.exports.get(&normalize(path)) {
            return Ok(Some(export.clone()));
        }
        if !path.exists() {
            return Ok(None);
        }
        Err(format!("no export is registered for {}", path.display()).into())
    }
}

fn normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

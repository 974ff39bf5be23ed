// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of packaged and project configuration documents.

use std::path::{Path, PathBuf};

use crate::config::{ConfigDocument, ConfigSourceSet, CONFIG_BASENAME, DATA_EXTENSIONS, SCRIPT_EXTENSIONS};
use crate::loader::ModuleLoader;

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

/// Files whose presence marks the root of a package.
pub const DEFAULT_ROOT_MARKERS: &[&str] = &["package.json", "Cargo.toml"];

/// Options for discovery behavior.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File or directory the packaged configuration ships beside. The
    /// packaged scope is skipped when unset.
    pub packaged_origin: Option<PathBuf>,

    /// Where to start the project walk; defaults to the working directory.
    pub cwd: Option<PathBuf>,

    /// Marker filenames delimiting a package root.
    pub root_markers: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            packaged_origin: None,
            cwd: None,
            root_markers: DEFAULT_ROOT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Discover and load packaged-public, project-public and project-local
/// configuration documents, in that order.
pub fn discover_config_sources(
    options: &DiscoveryOptions,
    loader: &dyn ModuleLoader,
) -> crate::Result<ConfigSourceSet> {
    let mut sources = ConfigSourceSet::default();

    let start = resolve_start_path(options.cwd.as_deref().unwrap_or(Path::new(".")));
    let project_root = find_package_root(&start, &options.root_markers);

    if let Some(origin) = &options.packaged_origin {
        match find_package_root(origin, &options.root_markers) {
            Some(root) if project_root.as_deref().is_some_and(|p| same_dir(p, &root)) => {
                // A tool run from inside the project it serves, e.g. `cargo run`
                tracing::debug!(root = %root.display(), "packaged root is the project root");
            }
            Some(root) => {
                tracing::debug!(root = %root.display(), "packaged config root");
                sources.packaged = load_first(&root, false, loader)?;
            }
            None => tracing::debug!(origin = %origin.display(), "no packaged root found"),
        }
    }

    match project_root {
        Some(root) => {
            tracing::debug!(root = %root.display(), "project config root");
            sources.project_public = load_first(&root, false, loader)?;
            sources.project_local = load_first(&root, true, loader)?;
        }
        None => tracing::debug!(start = %start.display(), "no project root found"),
    }

    Ok(sources)
}

/// Candidate filenames for one privacy bucket, in preference order.
pub fn config_filenames(local: bool) -> Vec<String> {
    let stem = if local {
        format!("{CONFIG_BASENAME}.local")
    } else {
        CONFIG_BASENAME.to_string()
    };
    DATA_EXTENSIONS
        .iter()
        .chain(SCRIPT_EXTENSIONS)
        .map(|ext| format!("{stem}.{ext}"))
        .collect()
}

/// Load the first candidate that exists in `dir`.
fn load_first(
    dir: &Path,
    local: bool,
    loader: &dyn ModuleLoader,
) -> crate::Result<Option<ConfigDocument>> {
    for name in config_filenames(local) {
        let path = dir.join(&name);
        if !path.is_file() {
            continue;
        }
        tracing::debug!(path = %path.display(), "loading config document");
        return ConfigDocument::load(&path, loader);
    }
    Ok(None)
}

/// Whether two paths name the same directory, looking through symlinks.
fn same_dir(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Resolve starting path, preferring $PWD to preserve symlinks.
fn resolve_start_path(start_path: &Path) -> PathBuf {
    if start_path.is_absolute() {
        start_path.to_owned()
    } else {
        match std::env::var("PWD").ok() {
            Some(pwd) => PathBuf::from(pwd).join(start_path),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(start_path),
        }
    }
}

/// Walk up from `start` to the nearest directory containing a marker file.
///
/// `start` may name a file, in which case the walk begins at its parent.
pub fn find_package_root<S: AsRef<str>>(start: &Path, markers: &[S]) -> Option<PathBuf> {
    let mut current = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        if markers
            .iter()
            .any(|marker| current.join(marker.as_ref()).is_file())
        {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::dynamic::DynamicValue;
use crate::expand::NoAmbient;
use crate::loader::{ModuleExport, NoModuleLoader, StaticModuleLoader};
use crate::provenance::{DynamicSource, Op, ProvenanceEntry};
use crate::validate::{SchemaError, SchemaOutcome};

fn create_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write file");
    path
}

struct Project {
    tmp: TempDir,
}

impl Project {
    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn options(&self) -> ResolveOptions {
        ResolveOptions {
            paths: Some(vec![self.root().to_string_lossy().to_string()]),
            discovery: DiscoveryOptions {
                cwd: Some(self.root().to_path_buf()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[fixture]
fn project() -> Project {
    let tmp = TempDir::new().unwrap();
    create_file(tmp.path(), "Cargo.toml", "[package]\nname = \"demo\"\n");
    create_file(tmp.path(), ".env", "APP=file\nHOST=localhost\nLEVEL=file\n");
    create_file(tmp.path(), ".env.dev", "LEVEL=file-dev\n");
    create_file(
        tmp.path(),
        "getdotenv.config.yaml",
        "vars:\n  URL: http://${HOST}\nenvVars:\n  dev:\n    LEVEL: config-dev\n",
    );
    Project { tmp }
}

fn resolve(
    options: &ResolveOptions,
    loader: &dyn ModuleLoader,
) -> crate::Result<ResolvedEnvironment> {
    resolve_dotenv_with(options, loader, &Expander::new(&NoAmbient))
}

fn kinds(resolved: &ResolvedEnvironment, key: &str) -> Vec<&'static str> {
    resolved
        .provenance
        .history(key)
        .iter()
        .map(ProvenanceEntry::kind)
        .collect()
}

fn computed_map(key: &str, value: &'static str) -> DynamicMap {
    let mut map = DynamicMap::new();
    map.insert(
        key.to_string(),
        DynamicValue::computed(move |env, _| {
            env.get("LEVEL")
                .cloned()
                .flatten()
                .map(|level| format!("{value}({level})"))
        }),
    );
    map
}

#[rstest]
fn test_static_tiers(project: Project) {
    let options = ResolveOptions {
        env: Some("dev".to_string()),
        ..project.options()
    };
    let resolved = resolve(&options, &NoModuleLoader).expect("Should resolve");

    assert_eq!(resolved.selected_env.as_deref(), Some("dev"));
    assert_eq!(resolved.env["APP"].as_deref(), Some("file"));
    assert_eq!(resolved.env["URL"].as_deref(), Some("http://localhost"));
    assert_eq!(resolved.env["LEVEL"].as_deref(), Some("config-dev"));
    assert_eq!(kinds(&resolved, "LEVEL"), vec!["file", "file", "config"]);
    assert!(resolved.diagnostics.is_empty());
}

#[rstest]
fn test_every_tier_in_order(project: Project) {
    let dynamic_file = create_file(project.root(), "dynamic.js", "export default {}");
    let loader = StaticModuleLoader::new().with_export(
        &dynamic_file,
        ModuleExport::dynamic(computed_map("LEVEL", "path")),
    );
    let options = ResolveOptions {
        env: Some("dev".to_string()),
        vars: Some(crate::env_from_pairs([("LEVEL", "vars")])),
        dynamic: Some(computed_map("LEVEL", "programmatic")),
        dynamic_path: Some(dynamic_file.to_string_lossy().to_string()),
        ..project.options()
    };

    let resolved = resolve(&options, &loader).expect("Should resolve");

    assert_eq!(
        resolved.env["LEVEL"].as_deref(),
        Some("path(programmatic(vars))")
    );
    assert_eq!(
        kinds(&resolved, "LEVEL"),
        vec!["file", "file", "config", "vars", "dynamic", "dynamic"]
    );
    assert_eq!(
        resolved.provenance.last("LEVEL"),
        Some(&ProvenanceEntry::Dynamic {
            op: Op::Set,
            dynamic_source: DynamicSource::DynamicPath,
            dynamic_path: Some(dynamic_file.to_string_lossy().to_string()),
        })
    );
}

#[rstest]
fn test_exclude_dynamic(project: Project) {
    let options = ResolveOptions {
        exclude_dynamic: Some(true),
        dynamic: Some(computed_map("LEVEL", "programmatic")),
        ..project.options()
    };

    let resolved = resolve(&options, &NoModuleLoader).expect("Should resolve");
    assert_eq!(resolved.env["LEVEL"].as_deref(), Some("file"));
    assert_eq!(kinds(&resolved, "LEVEL"), vec!["file"]);
}

#[rstest]
fn test_config_dynamic_runs_before_programmatic(project: Project) {
    let config = create_file(project.root(), "getdotenv.config.local.ts", "export default {}");
    let loader = StaticModuleLoader::new().with_export(
        &config,
        ModuleExport {
            dynamic: Some(computed_map("FROM_CONFIG", "config")),
            ..Default::default()
        },
    );
    let options = ResolveOptions {
        dynamic: Some(computed_map("FROM_CALLER", "programmatic")),
        ..project.options()
    };

    let resolved = resolve(&options, &loader).expect("Should resolve");
    assert_eq!(resolved.env["FROM_CONFIG"].as_deref(), Some("config(file)"));
    assert_eq!(
        resolved.env["FROM_CALLER"].as_deref(),
        Some("programmatic(file)")
    );
    let keys: Vec<&str> = resolved.env.keys().map(String::as_str).collect();
    assert_eq!(keys.last(), Some(&"FROM_CALLER"));
}

#[rstest]
fn test_missing_dynamic_path_is_ignored(project: Project) {
    let options = ResolveOptions {
        dynamic_path: Some(
            project
                .root()
                .join("absent.js")
                .to_string_lossy()
                .to_string(),
        ),
        ..project.options()
    };
    assert!(resolve(&options, &NoModuleLoader).is_ok());
}

#[rstest]
fn test_unloadable_dynamic_path_fails(project: Project) {
    let dynamic_file = create_file(project.root(), "dynamic.ts", "export default {}");
    let options = ResolveOptions {
        dynamic_path: Some(dynamic_file.to_string_lossy().to_string()),
        ..project.options()
    };

    let result = resolve(&options, &NoModuleLoader);
    assert!(matches!(result, Err(Error::DynamicLoadFailed { .. })));
}

#[rstest]
fn test_config_defaults_fill_options(project: Project) {
    create_file(project.root(), ".secrets", "TOKEN=from-secrets\n");
    create_file(project.root(), ".secrets.qa", "STAGE=qa\n");
    create_file(
        project.root(),
        "getdotenv.config.local.json",
        r#"{"defaults": {"dotenvToken": ".secrets", "defaultEnv": "qa"}}"#,
    );

    let resolved = resolve(&project.options(), &NoModuleLoader).expect("Should resolve");

    assert_eq!(resolved.selected_env.as_deref(), Some("qa"));
    assert_eq!(resolved.env["TOKEN"].as_deref(), Some("from-secrets"));
    assert_eq!(resolved.env["STAGE"].as_deref(), Some("qa"));
    assert!(!resolved.env.contains_key("APP"));
}

#[rstest]
fn test_caller_options_beat_config_defaults(project: Project) {
    create_file(
        project.root(),
        "getdotenv.config.local.json",
        r#"{"defaults": {"defaultEnv": "qa", "excludePublic": true}}"#,
    );
    let options = ResolveOptions {
        env: Some("dev".to_string()),
        exclude_public: Some(false),
        ..project.options()
    };

    let resolved = resolve(&options, &NoModuleLoader).expect("Should resolve");
    assert_eq!(resolved.selected_env.as_deref(), Some("dev"));
    assert_eq!(resolved.env["APP"].as_deref(), Some("file"));
}

#[rstest]
fn test_default_env_option(project: Project) {
    let options = ResolveOptions {
        default_env: Some("dev".to_string()),
        ..project.options()
    };
    let resolved = resolve(&options, &NoModuleLoader).expect("Should resolve");
    assert_eq!(resolved.selected_env.as_deref(), Some("dev"));
    assert_eq!(resolved.env["LEVEL"].as_deref(), Some("config-dev"));
}

#[rstest]
fn test_skip_config_discovery(project: Project) {
    let options = ResolveOptions {
        skip_config_discovery: true,
        ..project.options()
    };
    let resolved = resolve(&options, &NoModuleLoader).expect("Should resolve");
    assert!(resolved.sources.is_empty());
    assert!(!resolved.env.contains_key("URL"));
}

#[rstest]
fn test_diagnostics_are_reported(project: Project) {
    create_file(
        project.root(),
        "getdotenv.config.local.json",
        r#"{"requiredKeys": ["APP", "DATABASE_URL"]}"#,
    );

    let resolved = resolve(&project.options(), &NoModuleLoader).expect("Should resolve");
    assert_eq!(
        resolved.diagnostics,
        vec!["Missing required environment variable: DATABASE_URL"]
    );

    let strict = ResolveOptions {
        strict: true,
        ..project.options()
    };
    match resolve(&strict, &NoModuleLoader) {
        Err(Error::ValidationFailed(issues)) => assert_eq!(issues.len(), 1),
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[rstest]
fn test_schema_sees_dynamic_values(project: Project) {
    let config = create_file(project.root(), "getdotenv.config.local.ts", "export default {}");
    let schema = |env: &Environment| -> Result<SchemaOutcome, SchemaError> {
        match env.get("COMPUTED") {
            Some(Some(_)) => Ok(SchemaOutcome::Valid),
            _ => Ok(SchemaOutcome::Invalid(Vec::new())),
        }
    };
    let loader = StaticModuleLoader::new().with_export(
        &config,
        ModuleExport::data(json!({})).with_schema(std::sync::Arc::new(schema)),
    );
    let options = ResolveOptions {
        strict: true,
        dynamic: Some(computed_map("COMPUTED", "x")),
        ..project.options()
    };

    assert!(resolve(&options, &loader).is_ok());
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! getdotenv - Cascading Environment Variable Resolution
//!
//! This crate resolves a flat map of environment variables from layered
//! sources and records, for every key, which source wrote it.
//!
//! # Overview
//!
//! Values are resolved lowest precedence first:
//!
//! 1. dotenv files (`.env`, `.env.<env>`, `.env.local`, `.env.<env>.local`)
//!    across one or more search paths
//! 2. packaged, project public and project local config documents, each
//!    applying its `vars` and then `envVars[<env>]`
//! 3. explicit `vars` supplied by the caller
//! 4. dynamic values: config, programmatic, then the `dynamicPath` module
//!
//! Every stage expands `$VAR` and `${VAR:default}` references against what
//! has been resolved so far, and the final map is checked against the
//! `schema` or `requiredKeys` of the highest-precedence config document.
//!
//! # Example
//!
//! ```yaml
//! # getdotenv.config.yaml
//! vars:
//!   API_URL: https://${API_HOST:localhost}/v1
//!
//! envVars:
//!   dev:
//!     API_HOST: dev.example.com
//!
//! requiredKeys:
//!   - API_TOKEN
//!
//! defaults:
//!   defaultEnv: dev
//! ```

pub mod config;
pub mod discovery;
pub mod dotenv;
pub mod dynamic;
pub mod environment;
pub mod error;
pub mod expand;
pub mod loader;
pub mod overlay;
pub mod provenance;
pub mod resolve;
pub mod validate;
pub mod vars;

pub use config::{ConfigDefaults, ConfigDocument, ConfigSourceSet};
pub use discovery::{discover_config_sources, DiscoveryOptions};
pub use dotenv::{read_dotenv_cascade, CascadeOptions};
pub use dynamic::{apply_dynamic, DynamicLayer, DynamicMap, DynamicValue};
pub use environment::{env_from_pairs, present, Environment};
pub use error::{Error, Result};
pub use expand::{dotenv_expand, dotenv_expand_all, AmbientEnv, ExpandMode, Expander};
pub use loader::{ModuleExport, ModuleLoader, NoModuleLoader, StaticModuleLoader};
pub use overlay::overlay_env;
pub use provenance::{ProvenanceEntry, ProvenanceLog};
pub use resolve::{resolve_dotenv, resolve_dotenv_with, ResolveOptions, ResolvedEnvironment};
pub use validate::{validate_env, EnvSchema, SchemaIssue, SchemaOutcome};
pub use vars::parse_vars;

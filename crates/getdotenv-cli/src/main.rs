// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! getdotenv - Cascading Environment Variable Resolution CLI

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_check;
mod cmd_explain;
mod cmd_show;

use cmd_check::CmdCheck;
use cmd_explain::CmdExplain;
use cmd_show::CmdShow;

#[derive(Parser)]
#[clap(
    name = "getdotenv",
    about = "Cascading environment variable resolution",
    version,
    long_about = "Resolve environment variables from dotenv files, config documents and \
                  explicit overrides, and explain where each value came from"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

/// Options shared by every command that resolves an environment.
#[derive(Parser, Clone, Debug, Default)]
pub struct ResolveFlags {
    /// Selected environment name
    #[clap(long, short = 'e', env = "GETDOTENV_ENV")]
    pub env: Option<String>,

    /// Environment name used when --env is not given
    #[clap(long, env = "GETDOTENV_DEFAULT_ENV")]
    pub default_env: Option<String>,

    /// Dotenv base filename
    #[clap(long, env = "GETDOTENV_DOTENV_TOKEN")]
    pub dotenv_token: Option<String>,

    /// Suffix marking private dotenv files
    #[clap(long, env = "GETDOTENV_PRIVATE_TOKEN")]
    pub private_token: Option<String>,

    /// Dotenv search paths, later paths override earlier ones
    #[clap(long = "path", short = 'p', env = "GETDOTENV_PATHS", value_delimiter = ',')]
    pub paths: Vec<String>,

    /// Explicit overrides, e.g. "KEY=value OTHER=value"
    #[clap(long, env = "GETDOTENV_VARS")]
    pub vars: Option<String>,

    /// Separator between an override's key and value
    #[clap(long, default_value = getdotenv::vars::DEFAULT_VARS_ASSIGNOR)]
    pub vars_assignor: String,

    /// Separator between overrides
    #[clap(long, default_value = getdotenv::vars::DEFAULT_VARS_DELIMITER)]
    pub vars_delimiter: String,

    /// Module exporting dynamic values
    #[clap(long, env = "GETDOTENV_DYNAMIC_PATH")]
    pub dynamic_path: Option<String>,

    /// Skip all dynamic values
    #[clap(long)]
    pub exclude_dynamic: bool,

    /// Skip environment-specific dotenv files
    #[clap(long)]
    pub exclude_env: bool,

    /// Skip global dotenv files
    #[clap(long)]
    pub exclude_global: bool,

    /// Skip private dotenv files
    #[clap(long)]
    pub exclude_private: bool,

    /// Skip public dotenv files
    #[clap(long)]
    pub exclude_public: bool,

    /// Do not load getdotenv.config.* documents
    #[clap(long, env = "GETDOTENV_NO_CONFIG")]
    pub no_config: bool,
}

impl ResolveFlags {
    /// Build resolution options; unset flags defer to config defaults.
    pub fn options(&self) -> getdotenv::ResolveOptions {
        getdotenv::ResolveOptions {
            env: self.env.clone(),
            default_env: self.default_env.clone(),
            dotenv_token: self.dotenv_token.clone(),
            private_token: self.private_token.clone(),
            paths: (!self.paths.is_empty()).then(|| self.paths.clone()),
            exclude_dynamic: self.exclude_dynamic.then_some(true),
            exclude_env: self.exclude_env.then_some(true),
            exclude_global: self.exclude_global.then_some(true),
            exclude_private: self.exclude_private.then_some(true),
            exclude_public: self.exclude_public.then_some(true),
            vars: self.vars.as_deref().map(|vars| {
                getdotenv::parse_vars(vars, &self.vars_assignor, &self.vars_delimiter)
            }),
            dynamic: None,
            dynamic_path: self.dynamic_path.clone(),
            skip_config_discovery: self.no_config,
            discovery: getdotenv::DiscoveryOptions {
                packaged_origin: std::env::current_exe().ok(),
                ..Default::default()
            },
            strict: false,
        }
    }

    /// Resolve the environment for the current directory.
    pub fn resolve(&self) -> Result<getdotenv::ResolvedEnvironment> {
        let resolved = getdotenv::resolve_dotenv(&self.options(), &getdotenv::NoModuleLoader)?;
        tracing::debug!(
            keys = resolved.env.len(),
            env = ?resolved.selected_env,
            "resolved environment"
        );
        Ok(resolved)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved environment
    Show(CmdShow),

    /// Explain where variables got their values
    Explain(CmdExplain),

    /// Validate the resolved environment
    Check(CmdCheck),
}

impl Opt {
    fn run(self) -> Result<i32> {
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        // Keep stdout for resolved output
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        match self.cmd {
            Command::Show(mut cmd) => cmd.run(),
            Command::Explain(mut cmd) => cmd.run(),
            Command::Check(mut cmd) => cmd.run(),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}

//! Command-line interface for containerci.
//!
//! The tool runs as a single CI step. Every input can be passed as a flag or as
//! the `INPUT_<NAME>` environment variable the CI runner sets for step inputs:
//!
//! ```bash
//! # Stage 1: compute the matrix
//! containerci --mode generate-matrix --config-file containers.toml --config-format toml
//!
//! # Stage 2: one job per matrix row
//! INPUT_MODE=build INPUT_CONFIG='${{ toJSON(matrix) }}' containerci
//!
//! # Stage 3: gather outputs, then assemble manifests
//! containerci --mode combine-build-outputs --build-output-artifact-name-prefix build-output-
//! containerci --mode create-manifest --config-file containers.toml --config-format toml \
//!     --build-outputs "$BUILD_OUTPUTS"
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only warnings and errors
//! - `--engine` - Container engine binary (default `docker`, env `CONTAINER_ENGINE`)


use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::ci::{OutputSink, StepSummary, is_truthy};
use crate::config::ConfigFormat;
use crate::constants::{
    CONTAINER_ENGINE_ENV, DEFAULT_CONTAINER_ENGINE, GITHUB_OUTPUT_ENV, GITHUB_STEP_SUMMARY_ENV,
    GITHUB_WORKSPACE_ENV, SKIP_PUSH_ENV,
};
use crate::engine::ProcessEngine;
use crate::modes::{Mode, ModeInputs, RunContext, run_mode};
use crate::repository::RepositoryRegistry;
use crate::templating::TemplateVars;

/// Settings derived from global flags, separate from the parsed arguments so tests
/// can build them directly.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG`, falling back to `info`
    pub log_level: Option<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// Main CLI structure for containerci.
#[derive(Parser, Debug)]
#[command(
    name = "containerci",
    about = "Build multi-platform container images from a declarative config in CI",
    version,
    long_about = "containerci expands a container build config into a CI job matrix, builds and pushes each \
                  platform image, and assembles multi-platform manifests."
)]
pub struct Cli {
    /// Stage to run
    #[arg(long, value_enum, env = "INPUT_MODE")]
    mode: Mode,

    /// Inline config document; takes precedence over --config-file
    #[arg(long, env = "INPUT_CONFIG")]
    config: Option<String>,

    /// Path to the config document
    #[arg(long, env = "INPUT_CONFIG-FILE")]
    config_file: Option<PathBuf>,

    /// Format of the config document
    #[arg(long, value_enum, env = "INPUT_CONFIG-FORMAT")]
    config_format: Option<ConfigFormat>,

    /// Build outputs JSON (create-manifest)
    #[arg(long, env = "INPUT_BUILD-OUTPUTS")]
    build_outputs: Option<String>,

    /// Directory name prefix of persisted build outputs
    #[arg(long, env = "INPUT_BUILD-OUTPUT-ARTIFACT-NAME-PREFIX")]
    build_output_artifact_name_prefix: Option<String>,

    /// Job key to build from a full config (build)
    #[arg(long, env = "INPUT_BUILD-NAME")]
    build_name: Option<String>,

    /// Build without logging in or pushing
    #[arg(long, env = "INPUT_SKIP-PUSH")]
    skip_push: Option<String>,

    /// Do not write the step summary
    #[arg(long, env = "INPUT_SKIP-STEP-SUMMARY")]
    skip_step_summary: Option<String>,

    /// Container engine binary
    #[arg(long, env = CONTAINER_ENGINE_ENV, default_value = DEFAULT_CONTAINER_ENGINE)]
    engine: String,

    /// Workspace directory for build outputs (defaults to GITHUB_WORKSPACE, then the
    /// current directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Execute the selected mode against the real process environment.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_vars(TemplateVars::from_env()).await
    }

    /// Build a [`CliConfig`] from the parsed CLI arguments.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("warn".to_string())
        } else {
            None
        };
        CliConfig {
            log_level,
        }
    }

    /// Execute against an explicit environment snapshot.
    pub async fn execute_with_vars(self, vars: TemplateVars) -> Result<()> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let ctx = self.run_context(vars, cwd);
        let inputs = self.inputs();
        run_mode(self.mode, &ctx, &inputs).await?;
        Ok(())
    }

    fn inputs(&self) -> ModeInputs {
        ModeInputs {
            config: self.config.clone(),
            config_file: self.config_file.clone(),
            config_format: self.config_format,
            build_outputs: self.build_outputs.clone(),
            build_output_artifact_name_prefix: self.build_output_artifact_name_prefix.clone(),
            build_name: self.build_name.clone(),
        }
    }

    fn run_context(&self, vars: TemplateVars, cwd: PathBuf) -> RunContext {
        let workspace = self
            .workspace
            .clone()
            .or_else(|| vars.env_var(GITHUB_WORKSPACE_ENV).map(PathBuf::from))
            .unwrap_or_else(|| cwd.clone());

        let skip_push = self.skip_push.as_deref().is_some_and(is_truthy)
            || vars.env_var(SKIP_PUSH_ENV).is_some_and(is_truthy);
        let write_summary = !self.skip_step_summary.as_deref().is_some_and(is_truthy);
        debug!(
            "Workspace: {}, engine: {}, skip push: {}, step summary: {}",
            workspace.display(),
            self.engine,
            skip_push,
            write_summary
        );

        RunContext {
            workspace,
            cwd,
            engine: Box::new(ProcessEngine::new(&self.engine)),
            registry: RepositoryRegistry::with_builtin(),
            outputs: OutputSink::new(vars.env_var(GITHUB_OUTPUT_ENV).map(PathBuf::from)),
            summary: StepSummary::new(
                vars.env_var(GITHUB_STEP_SUMMARY_ENV).map(PathBuf::from),
                write_summary,
            ),
            skip_push,
            vars,
        }
    }
}

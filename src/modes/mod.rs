//! The four run modes.
//!
//! A CI workflow calls the tool once per stage:
//!
//! 1. `generate-matrix` resolves the config and emits the job matrices
//! 2. `build` runs one matrix row and persists its `buildOutput.json`
//! 3. `combine-build-outputs` gathers every persisted build output
//! 4. `create-manifest` assembles and pushes the multi-platform manifests
//!
//! Every mode reads its collaborators from a [`RunContext`] and returns a
//! [`ModeReturn`] whose populated fields become step outputs.

mod build;
mod combine_build_outputs;
mod create_manifest;
mod generate_matrix;

pub use build::build_mode;
pub use combine_build_outputs::combine_build_outputs_mode;
pub use create_manifest::create_manifest_mode;
pub use generate_matrix::generate_matrix_mode;

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ci::{OutputSink, StepSummary};
use crate::config::{
    Config, ConfigFormat, FinalizedConfig, parse_config_str, read_config_source, resolve_config,
};
use crate::constants::GIT_PROJECT_ROOT_VAR;
use crate::core::ContainerCiError;
use crate::engine::ContainerEngine;
use crate::git::find_project_root;
use crate::matrix::Matrix;
use crate::repository::RepositoryRegistry;
use crate::templating::TemplateVars;

/// Run mode selected by the `mode` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    GenerateMatrix,
    Build,
    CreateManifest,
    CombineBuildOutputs,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GenerateMatrix => "generate-matrix",
            Self::Build => "build",
            Self::CreateManifest => "create-manifest",
            Self::CombineBuildOutputs => "combine-build-outputs",
        };
        f.write_str(name)
    }
}

/// Mode inputs, as received from the CI step.
#[derive(Debug, Clone, Default)]
pub struct ModeInputs {
    /// Inline config document; wins over `config_file`
    pub config: Option<String>,
    pub config_file: Option<PathBuf>,
    pub config_format: Option<ConfigFormat>,
    /// Build outputs JSON for `create-manifest`
    pub build_outputs: Option<String>,
    /// Directory name prefix of persisted build outputs
    pub build_output_artifact_name_prefix: Option<String>,
    /// Job key to build from a full config document
    pub build_name: Option<String>,
}

impl ModeInputs {
    /// Read the config source (inline or file) as text.
    pub fn config_text(&self) -> Result<String> {
        read_config_source(self.config.as_deref(), self.config_file.as_deref())
    }

    /// The config format; required whenever a config document is read.
    pub fn required_format(&self) -> Result<ConfigFormat> {
        self.config_format.ok_or_else(|| {
            ContainerCiError::InvalidInput {
                name: "config-format".to_string(),
                reason: "must be one of toml, json, yaml".to_string(),
            }
            .into()
        })
    }

    /// The artifact prefix with empty values treated as absent.
    pub fn prefix(&self) -> Option<&str> {
        self.build_output_artifact_name_prefix.as_deref().filter(|prefix| !prefix.is_empty())
    }
}

/// Everything a mode needs from its surroundings.
pub struct RunContext {
    /// Captured environment plus run-wide extras
    pub vars: TemplateVars,
    /// Directory build outputs are written to and scanned from
    pub workspace: PathBuf,
    /// Directory source root discovery starts from
    pub cwd: PathBuf,
    pub engine: Box<dyn ContainerEngine>,
    pub registry: RepositoryRegistry,
    pub outputs: OutputSink,
    pub summary: StepSummary,
    pub skip_push: bool,
}

impl RunContext {
    /// Template variables with `GIT_PROJECT_ROOT` filled in.
    ///
    /// The root is discovered only when the caller has not already provided it.
    pub async fn vars_with_project_root(&self) -> Result<TemplateVars> {
        if self.vars.get(GIT_PROJECT_ROOT_VAR).is_some() {
            return Ok(self.vars.clone());
        }
        let root = find_project_root(&self.vars, &self.cwd).await?;
        info!("Git project root: {}", root.display());
        Ok(self.vars.clone().with_var(GIT_PROJECT_ROOT_VAR, root.to_string_lossy()))
    }

    /// Parse, validate and render the config named by `inputs`.
    pub async fn load_config(&self, inputs: &ModeInputs) -> Result<FinalizedConfig> {
        info!("Getting config, validating, parsing and generating values...");
        let format = inputs.required_format()?;
        let text = inputs.config_text()?;
        debug!("Config format: {}", format);

        let raw: Config = parse_config_str(&text, format)?;
        let vars = self.vars_with_project_root().await?;
        let config = resolve_config(&raw, &vars).context("Failed to resolve config")?;
        info!("Loaded configuration for {} containers", config.len());
        Ok(config)
    }
}

/// Values a mode publishes as step outputs.
#[derive(Debug, Clone, Default)]
pub struct ModeReturn {
    pub finalized_container_config: Option<FinalizedConfig>,
    pub job_matrix: Option<Matrix>,
    pub linux_matrix: Option<Matrix>,
    pub windows_matrix: Option<Matrix>,
    pub build_output: Option<serde_json::Value>,
    pub build_output_path: Option<PathBuf>,
}

impl ModeReturn {
    /// Write every populated field to `sink`.
    pub fn emit(&self, sink: &OutputSink) -> Result<()> {
        if let Some(config) = &self.finalized_container_config {
            sink.set_json_output("finalizedContainerConfig", config)?;
        }
        if let Some(matrix) = &self.job_matrix {
            sink.set_json_output("jobMatrix", matrix)?;
        }
        if let Some(matrix) = &self.linux_matrix {
            sink.set_json_output("linuxMatrix", matrix)?;
        }
        if let Some(matrix) = &self.windows_matrix {
            sink.set_json_output("windowsMatrix", matrix)?;
        }
        if let Some(output) = &self.build_output {
            sink.set_json_output("build-output-json", output)?;
        }
        if let Some(path) = &self.build_output_path {
            sink.set_output("build-output-json-path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Run `mode` and publish its outputs.
pub async fn run_mode(mode: Mode, ctx: &RunContext, inputs: &ModeInputs) -> Result<ModeReturn> {
    info!("Running mode {}", mode);
    let result = match mode {
        Mode::GenerateMatrix => generate_matrix_mode(ctx, inputs).await?,
        Mode::Build => build_mode(ctx, inputs).await?,
        Mode::CreateManifest => create_manifest_mode(ctx, inputs).await?,
        Mode::CombineBuildOutputs => combine_build_outputs_mode(ctx, inputs).await?,
    };
    result.emit(&ctx.outputs)?;
    Ok(result)
}

/// Directory holding the build output of `job`: `<workspace>/<prefix><job>`, or the
/// workspace itself without a prefix.
pub fn build_output_dir(workspace: &Path, prefix: Option<&str>, job: &str) -> PathBuf {
    match prefix {
        Some(prefix) => workspace.join(format!("{prefix}{job}")),
        None => workspace.to_path_buf(),
    }
}

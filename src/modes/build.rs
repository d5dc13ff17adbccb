//! `build`: run one matrix row.
//!
//! The row comes either from the `config` input as a JSON matrix row, or, when
//! `build-name` is set, from resolving the full config document and selecting the
//! row with that job key.

use anyhow::{Context, Result};
use std::fs;
use tracing::info;

use super::{ModeInputs, ModeReturn, RunContext, build_output_dir};
use crate::build::{BuildContext, BuildOutput, run_build};
use crate::ci::{SummaryTable, code};
use crate::constants::{BUILD_OUTPUT_FILE_NAME, GITHUB_TOKEN_ENV};
use crate::core::ContainerCiError;
use crate::matrix::{JobInclude, build_matrix};

pub async fn build_mode(ctx: &RunContext, inputs: &ModeInputs) -> Result<ModeReturn> {
    if ctx.vars.env_var(GITHUB_TOKEN_ENV).is_none() {
        return Err(ContainerCiError::MissingEnvironment {
            name: GITHUB_TOKEN_ENV.to_string(),
        }
        .into());
    }

    let job = load_job(ctx, inputs).await?;
    let vars = ctx.vars_with_project_root().await?;
    let build_ctx = BuildContext {
        vars: &vars,
        engine: ctx.engine.as_ref(),
        registry: &ctx.registry,
        skip_push: ctx.skip_push,
    };
    let output = run_build(&job, &build_ctx).await?;

    let dir = build_output_dir(&ctx.workspace, inputs.prefix(), &job.job);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create build output directory: {}", dir.display()))?;
    let path = dir.join(BUILD_OUTPUT_FILE_NAME);
    fs::write(&path, serde_json::to_string_pretty(&output)?)
        .with_context(|| format!("Failed to write build output: {}", path.display()))?;
    info!("Build output written to {}", path.display());

    ctx.summary.write(&summary(&output))?;

    Ok(ModeReturn {
        build_output: Some(serde_json::to_value(&output)?),
        build_output_path: Some(path),
        ..Default::default()
    })
}

async fn load_job(ctx: &RunContext, inputs: &ModeInputs) -> Result<JobInclude> {
    if let Some(build_name) = inputs.build_name.as_deref().filter(|name| !name.is_empty()) {
        let config = ctx.load_config(inputs).await?;
        let matrix = build_matrix(&config).unwrap_or_default();
        return matrix.find(build_name).cloned().ok_or_else(|| {
            ContainerCiError::InvalidInput {
                name: "build-name".to_string(),
                reason: format!(
                    "No job named '{build_name}'. Available jobs: {}",
                    matrix.job.join(", ")
                ),
            }
            .into()
        });
    }

    let text = inputs.config_text()?;
    serde_json::from_str(&text).map_err(|e| {
        ContainerCiError::InvalidInput {
            name: "config".to_string(),
            reason: format!("expected a JSON matrix row: {e}"),
        }
        .into()
    })
}

fn summary(output: &BuildOutput) -> String {
    let info = &output.build_info;
    let platform = info.platform.as_deref().map_or_else(|| "default".to_string(), code);
    let mut details = SummaryTable::new(["Property", "Value"])
        .row(["Container".to_string(), code(output.container_name())])
        .row(["Platform".to_string(), platform])
        .row(["Primary Tag".to_string(), code(&info.primary_tag)])
        .row(["Total Tags".to_string(), info.total_tags.to_string()])
        .row(["Builder".to_string(), format!("{}/{}", info.builder_os, info.builder_arch)]);
    if let Some(target) = &info.target {
        details.add_row(["Target".to_string(), code(target)]);
    }

    let mut tags = SummaryTable::new(["Tag"]);
    for tag in &info.tags {
        tags.add_row([code(tag)]);
    }

    let mut out = format!("## 🐳 Build: {}\n\n{}\n", output.config.job, details.render());
    out.push_str("### 🏷️ Tags\n\n");
    out.push_str(&tags.render());
    if !info.build_args.is_empty() {
        let mut args = SummaryTable::new(["Build Argument", "Value"]);
        for (name, value) in &info.build_args {
            args.add_row([code(name), code(value)]);
        }
        out.push_str("\n### ⚙️ Build Arguments\n\n");
        out.push_str(&args.render());
    }
    out
}

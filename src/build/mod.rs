//! Per-job container builds.
//!
//! [`run_build`] executes one matrix row: it renders the platform's tag templates,
//! resolves build arguments, logs in to the platform's repositories, builds the
//! image, tags it for every repository and pushes every tag. The result is a
//! [`BuildOutput`] record that later jobs read back to assemble manifests.
//!
//! Tags are full references `{registry}/{repository}:{tag}` for each selected
//! repository; a platform without repositories builds plain local tags. The first
//! tag of the first repository is the primary tag.

mod args;

pub use args::{resolve_build_arg, resolve_build_args};

use anyhow::{Context, Result};
use futures::StreamExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::pin::pin;
use tracing::{info, warn};

use crate::config::FinalizedRepositoryConfig;
use crate::constants::{
    ARCH_VAR, CONTAINER_NAME_VAR, DEFAULT_PLATFORM_TAG_TEMPLATE, JOB_VAR, PLATFORM_SLUG_VAR,
};
use crate::engine::{ContainerEngine, EngineInvocation};
use crate::matrix::JobInclude;
use crate::repository::{RepositoryRegistry, login_to_repositories, render_repository};
use crate::templating::{TemplateRenderer, TemplateVars};

/// Record of one finished build job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    /// The matrix row the job ran
    pub config: JobInclude,
    pub build_info: BuildInfo,
}

impl BuildOutput {
    pub fn container_name(&self) -> &str {
        &self.config.container_name
    }
}

/// What a build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub primary_tag: String,
    pub tags: Vec<String>,
    pub total_tags: usize,
    pub build_args: IndexMap<String, String>,
    pub target: Option<String>,
    /// Platform slug passed to `--platform`
    pub platform: Option<String>,
    pub builder_os: String,
    pub builder_arch: String,
}

/// Collaborators of a build job.
pub struct BuildContext<'a> {
    /// Captured environment plus run-wide extras
    pub vars: &'a TemplateVars,
    pub engine: &'a dyn ContainerEngine,
    pub registry: &'a RepositoryRegistry,
    /// Build and tag only; no login and no push
    pub skip_push: bool,
}

/// Variables visible to a job's templates.
pub fn job_vars(job: &JobInclude, vars: &TemplateVars) -> TemplateVars {
    let mut job_vars = vars.clone().with_var(CONTAINER_NAME_VAR, job.container_name.as_str());
    job_vars.insert(JOB_VAR, job.job.as_str());
    // Windows platforms and slug-less Linux platforms have no arch; they render empty
    job_vars.insert(ARCH_VAR, job.platform.arch.as_deref().unwrap_or_default());
    job_vars.insert(
        PLATFORM_SLUG_VAR,
        job.platform.platform_slug.as_deref().unwrap_or_default(),
    );
    job_vars
}

/// Render a job's tag templates and expand them per repository.
///
/// Repositories must already be rendered.
pub fn compute_tags(
    job: &JobInclude,
    repositories: &[FinalizedRepositoryConfig],
    vars: &TemplateVars,
) -> Result<Vec<String>> {
    let templates = if job.platform.platform_tag_templates.is_empty() {
        warn!(
            "No platform tag templates for job {}, using {}",
            job.job, DEFAULT_PLATFORM_TAG_TEMPLATE
        );
        vec![DEFAULT_PLATFORM_TAG_TEMPLATE.to_string()]
    } else {
        job.platform.platform_tag_templates.clone()
    };

    let tags = TemplateRenderer::new(vars)
        .render_all(&templates)
        .with_context(|| format!("Failed to render platform tags for job {}", job.job))?;

    if repositories.is_empty() {
        return Ok(tags);
    }
    Ok(tags
        .iter()
        .flat_map(|tag| repositories.iter().map(move |repository| repository.image_ref(tag)))
        .collect())
}

/// Run one build job.
pub async fn run_build(job: &JobInclude, ctx: &BuildContext<'_>) -> Result<BuildOutput> {
    info!("Building job {} for container {}", job.job, job.container_name);
    let vars = job_vars(job, ctx.vars);

    let repositories = job
        .platform
        .repositories
        .values()
        .map(|repository| render_repository(repository, &vars))
        .collect::<Result<Vec<_>>>()?;

    let tags = compute_tags(job, &repositories, &vars)?;
    let Some(primary_tag) = tags.first().cloned() else {
        anyhow::bail!("No tags were produced for job {}", job.job);
    };
    info!("Primary tag: {} ({} tags total)", primary_tag, tags.len());

    let build_args = resolve_build_args(&job.platform.build_args, &vars)
        .await
        .with_context(|| format!("Failed to resolve build arguments for job {}", job.job))?;

    if ctx.skip_push {
        info!("Skipping registry login and push");
    } else {
        let mut logins = pin!(login_to_repositories(
            &job.platform.repositories,
            &vars,
            ctx.registry,
            ctx.engine
        ));
        while let Some(login) = logins.next().await {
            let login = login?;
            info!("Logged in to {}", login.repository.registry);
        }
    }

    let build = EngineInvocation::Build {
        containerfile: job.platform.containerfile_path.clone(),
        tag: primary_tag.clone(),
        build_args: build_args.clone(),
        target: job.platform.target.clone(),
        platform: job.platform.platform_slug.clone(),
        context: job.platform.context_path.clone(),
    };
    ctx.engine.run(&build).await.with_context(|| format!("Failed to build {primary_tag}"))?;

    for tag in tags.iter().skip(1) {
        let invocation = EngineInvocation::Tag {
            source: primary_tag.clone(),
            target: tag.clone(),
        };
        ctx.engine.run(&invocation).await.with_context(|| format!("Failed to tag {tag}"))?;
    }

    if !ctx.skip_push {
        for tag in &tags {
            info!("Pushing {}", tag);
            let invocation = EngineInvocation::Push {
                tag: tag.clone(),
            };
            ctx.engine.run(&invocation).await.with_context(|| format!("Failed to push {tag}"))?;
        }
    }

    Ok(BuildOutput {
        config: job.clone(),
        build_info: BuildInfo {
            primary_tag,
            total_tags: tags.len(),
            tags,
            build_args,
            target: job.platform.target.clone(),
            platform: job.platform.platform_slug.clone(),
            builder_os: std::env::consts::OS.to_string(),
            builder_arch: std::env::consts::ARCH.to_string(),
        },
    })
}

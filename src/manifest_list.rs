//! Multi-platform manifest creation.
//!
//! After every platform of a container is built and pushed, [`combine`] creates one
//! manifest list per (repository × manifest tag) that references the primary tag
//! of each platform build, then pushes it.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::pin::pin;
use tracing::{debug, info};

use crate::build::BuildOutput;
use crate::ci::{SummaryTable, code};
use crate::config::FinalizedContainerConfig;
use crate::constants::CONTAINER_NAME_VAR;
use crate::core::ContainerCiError;
use crate::engine::{ContainerEngine, EngineInvocation};
use crate::repository::{RepositoryRegistry, login_to_repositories};
use crate::templating::{TemplateRenderer, TemplateVars};

/// Collaborators of the manifest step.
pub struct CombineContext<'a> {
    pub vars: &'a TemplateVars,
    pub engine: &'a dyn ContainerEngine,
    pub registry: &'a RepositoryRegistry,
    /// Log what would be created without touching the engine
    pub skip_push: bool,
}

/// What [`combine`] did for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineReport {
    pub container_name: String,
    /// Rendered manifest tags, before repository expansion
    pub manifest_tags: Vec<String>,
    /// Full manifest references created and pushed
    pub pushed: Vec<String>,
    /// Primary tags of the included platform builds
    pub primary_tags: Vec<String>,
    /// Platform slugs of the included builds
    pub platforms: Vec<String>,
    /// Registries logged in to
    pub registries: Vec<String>,
}

impl CombineReport {
    /// Markdown section for the step summary.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("### 📦 Container: {}\n\n", self.container_name);

        if !self.registries.is_empty() {
            let mut logins = SummaryTable::new(["Status", "Registry"]);
            for registry in &self.registries {
                logins.add_row(["✅ Success".to_string(), code(registry)]);
            }
            out.push_str("#### 🔐 Registry Login\n\n");
            out.push_str(&logins.render());
            out.push('\n');
        }

        let mut tags = SummaryTable::new(["Tag"]);
        for tag in &self.manifest_tags {
            tags.add_row([code(tag)]);
        }
        out.push_str("#### 🏷️ Manifest Tags\n\n");
        out.push_str(&tags.render());
        out.push('\n');

        let mut platforms = SummaryTable::new(["Platform", "Tag", "Status"]);
        for (platform, tag) in self.platforms.iter().zip(&self.primary_tags) {
            platforms.add_row([code(platform), code(tag), "✅ Included".to_string()]);
        }
        out.push_str("#### 💻 Included Platforms\n\n");
        out.push_str(&platforms.render());
        out.push('\n');

        let primary = self.manifest_tags.first().map_or_else(|| "-".to_string(), |t| code(t));
        let results = SummaryTable::new(["Metric", "Value"])
            .row(["🏆 Primary Tag".to_string(), primary])
            .row(["📊 Total Tags".to_string(), self.manifest_tags.len().to_string()])
            .row(["💻 Total Platforms".to_string(), self.primary_tags.len().to_string()])
            .row(["✅ Status", "Success"]);
        out.push_str("#### 🚀 Manifest Results\n\n");
        out.push_str(&results.render());
        out.push('\n');
        out
    }
}

/// Create and push the manifest lists of one container.
///
/// `outputs` may contain builds of other containers; only those whose
/// `containerName` matches are used. Having none is an error.
pub async fn combine<'o>(
    container_name: &str,
    container: &FinalizedContainerConfig,
    outputs: impl IntoIterator<Item = &'o BuildOutput>,
    ctx: &CombineContext<'_>,
) -> Result<CombineReport> {
    info!("Starting manifest creation for container: {}", container_name);

    let builds: Vec<&BuildOutput> =
        outputs.into_iter().filter(|output| output.container_name() == container_name).collect();
    if builds.is_empty() {
        return Err(ContainerCiError::NoPrimaryTags {
            container: container_name.to_string(),
        }
        .into());
    }
    let primary_tags: Vec<String> =
        builds.iter().map(|build| build.build_info.primary_tag.clone()).collect();
    info!("Found {} primary tags", primary_tags.len());

    if container.manifest_tag_templates.is_empty() {
        return Err(ContainerCiError::InvalidInput {
            name: "manifestTagTemplates".to_string(),
            reason: format!("No manifest tag templates found for container {container_name}"),
        }
        .into());
    }

    let vars = ctx.vars.clone().with_var(CONTAINER_NAME_VAR, container_name);
    let manifest_tags = TemplateRenderer::new(&vars)
        .render_all(&container.manifest_tag_templates)
        .with_context(|| format!("Failed to render manifest tags for container {container_name}"))?;
    debug!("Manifest tags: {:?}", manifest_tags);

    let Some(repositories) = container.manifest_repositories() else {
        info!("Container {} has no repositories, nothing to push", container_name);
        return Ok(CombineReport {
            container_name: container_name.to_string(),
            manifest_tags,
            pushed: Vec::new(),
            primary_tags,
            platforms: platforms_of(&builds),
            registries: Vec::new(),
        });
    };
    info!("Found {} repositories to authenticate with", repositories.len());

    let mut registries = Vec::new();
    let mut rendered_repositories = Vec::new();
    if ctx.skip_push {
        for repository in repositories.values() {
            rendered_repositories.push(crate::repository::render_repository(repository, &vars)?);
        }
    } else {
        let mut logins = pin!(login_to_repositories(repositories, &vars, ctx.registry, ctx.engine));
        while let Some(login) = logins.next().await {
            let login = login?;
            info!("Successfully logged in to {}", login.repository.registry);
            registries.push(login.repository.registry.clone());
            rendered_repositories.push(login.repository);
        }
    }

    let mut pushed = Vec::new();
    for manifest_tag in &manifest_tags {
        for repository in &rendered_repositories {
            let manifest = repository.image_ref(manifest_tag);
            if ctx.skip_push {
                info!("Skipping manifest {} (push disabled)", manifest);
                continue;
            }

            info!("Creating manifest {} with tags: {}", manifest, primary_tags.join(", "));
            let create = EngineInvocation::ManifestCreate {
                manifest: manifest.clone(),
                images: primary_tags.clone(),
            };
            ctx.engine
                .run(&create)
                .await
                .with_context(|| format!("Failed to create manifest {manifest}"))?;

            info!("Pushing manifest: {}", manifest);
            let push = EngineInvocation::ManifestPush {
                manifest: manifest.clone(),
            };
            ctx.engine
                .run(&push)
                .await
                .with_context(|| format!("Failed to push manifest {manifest}"))?;
            pushed.push(manifest);
        }
    }

    info!("Completed manifest creation for container: {}", container_name);
    Ok(CombineReport {
        container_name: container_name.to_string(),
        manifest_tags,
        pushed,
        primary_tags,
        platforms: platforms_of(&builds),
        registries,
    })
}

fn platforms_of(builds: &[&BuildOutput]) -> Vec<String> {
    builds
        .iter()
        .map(|build| build.build_info.platform.clone().unwrap_or_else(|| "default".to_string()))
        .collect()
}

//! Config resolution: validation followed by field-by-field rendering.

use anyhow::{Context, Result};
use indexmap::IndexMap;

use super::finalized::{
    FinalizedBuildArgConfig, FinalizedConfig, FinalizedContainerConfig, FinalizedPlatformConfig,
};
use super::types::{CiConfig, CiValue, Config};
use super::validation::validate_config;
use crate::constants::{ARCH_VAR, CONTAINER_NAME_VAR, PLATFORM_SLUG_VAR};
use crate::templating::{TemplateRenderer, TemplateVars};

/// Validate a raw config and render the string fields of the finalized tree.
///
/// Rendered here: containerfile and context paths, target, platform slug, arch, CI
/// metadata strings and build-argument fields. Tag templates and repository records
/// keep their placeholders; they need per-job and per-login variables and are
/// rendered by the build, manifest and login steps.
///
/// `vars` is the captured environment plus caller extras such as
/// `GIT_PROJECT_ROOT`. Each container additionally sees `CONTAINER_NAME`, and each
/// platform sees its own `PLATFORM_SLUG` and `ARCH` once those are rendered.
pub fn resolve_config(config: &Config, vars: &TemplateVars) -> Result<FinalizedConfig> {
    let validated = validate_config(config)?;

    let mut containers = IndexMap::with_capacity(validated.len());
    for (name, container) in validated.containers {
        let container_vars = vars.clone().with_var(CONTAINER_NAME_VAR, name.as_str());
        let rendered = render_container(container, &container_vars)
            .with_context(|| format!("Failed to render config for container '{name}'"))?;
        containers.insert(name, rendered);
    }

    Ok(FinalizedConfig {
        containers,
    })
}

fn render_container(
    container: FinalizedContainerConfig,
    vars: &TemplateVars,
) -> Result<FinalizedContainerConfig> {
    let render_all = |platforms: IndexMap<String, FinalizedPlatformConfig>| {
        platforms
            .into_iter()
            .map(|(key, platform)| -> Result<(String, FinalizedPlatformConfig)> {
                let rendered = render_platform(platform, vars)
                    .with_context(|| format!("Failed to render platform '{key}'"))?;
                Ok((key, rendered))
            })
            .collect::<Result<IndexMap<_, _>>>()
    };

    Ok(FinalizedContainerConfig {
        manifest_tag_templates: container.manifest_tag_templates,
        linux_platforms: render_all(container.linux_platforms)?,
        windows_platforms: render_all(container.windows_platforms)?,
    })
}

fn render_platform(
    platform: FinalizedPlatformConfig,
    vars: &TemplateVars,
) -> Result<FinalizedPlatformConfig> {
    let base = TemplateRenderer::new(vars);
    let platform_slug = base.render_opt(platform.platform_slug.as_deref())?;
    let arch = base.render_opt(platform.arch.as_deref())?;

    let mut platform_vars = vars.clone();
    platform_vars.insert(PLATFORM_SLUG_VAR, platform_slug.as_deref().unwrap_or_default());
    platform_vars.insert(ARCH_VAR, arch.as_deref().unwrap_or_default());
    let renderer = TemplateRenderer::new(&platform_vars);

    Ok(FinalizedPlatformConfig {
        containerfile_path: renderer.render(&platform.containerfile_path)?,
        context_path: renderer.render(&platform.context_path)?,
        target: renderer.render_opt(platform.target.as_deref())?,
        ci: render_ci(&platform.ci, &renderer)?,
        platform_slug,
        arch,
        build_args: platform
            .build_args
            .into_iter()
            .map(|(name, arg)| -> Result<(String, FinalizedBuildArgConfig)> {
                Ok((name, render_build_arg(arg, &renderer)?))
            })
            .collect::<Result<_>>()?,
        platform_tag_templates: platform.platform_tag_templates,
        repositories: platform.repositories,
    })
}

fn render_ci(ci: &CiConfig, renderer: &TemplateRenderer) -> Result<CiConfig> {
    ci.iter()
        .map(|(key, value)| -> Result<(String, CiValue)> {
            let rendered = match value {
                CiValue::String(s) => CiValue::String(renderer.render(s)?),
                CiValue::List(items) => CiValue::List(renderer.render_all(items)?),
                other => other.clone(),
            };
            Ok((key.clone(), rendered))
        })
        .collect()
}

fn render_build_arg(
    arg: FinalizedBuildArgConfig,
    renderer: &TemplateRenderer,
) -> Result<FinalizedBuildArgConfig> {
    Ok(FinalizedBuildArgConfig {
        default: renderer.render_opt(arg.default.as_deref())?,
        cmd: renderer.render_opt(arg.cmd.as_deref())?,
        env_var: renderer.render_opt(arg.env_var.as_deref())?,
        order_precedence: arg.order_precedence,
    })
}

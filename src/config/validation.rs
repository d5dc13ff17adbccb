//! Config validation and defaults merging.
//!
//! Every function here is pure: it reads a raw level and its already-finalized
//! parent and returns a new finalized value. The call chain root default →
//! container default → platform makes the merge cascade three levels deep.
//!
//! Field rules:
//!
//! | Field | Rule |
//! |---|---|
//! | `containerfilePath`, `contextPath`, `target` | non-empty child, else non-empty parent, else fallback |
//! | `ci` | parent keys overridden by child keys |
//! | `selectedBuildArgs` | non-empty child, else parent |
//! | `buildArgs` | union of keys, merged field by field |
//! | tag templates, `selectedRepositories` | child when present (even empty), else parent, else fallback |
//!
//! Only schema violations, unknown repositories, missing platforms and the
//! no-tag-templates case are errors. Everything else is a `warn!` event.

use anyhow::Result;
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::finalized::{
    FinalizedBuildArgConfig, FinalizedConfig, FinalizedContainerConfig, FinalizedDefaults,
    FinalizedPlatformConfig, FinalizedRepositoryConfig,
};
use super::types::{
    BuildArgConfig, BuildArgPrecedence, CiConfig, Config, ConfigDefaults, ContainerConfig,
    PlatformConfig, PlatformOs, RepositoryConfig,
};
use crate::constants::{
    DEFAULT_CONTAINERFILE_PATH, DEFAULT_CONTEXT_PATH, DEFAULT_MANIFEST_TAG_TEMPLATE,
    DEFAULT_PLATFORM_TAG_TEMPLATE, LINUX_PLATFORM_PREFIX,
};
use crate::core::ContainerCiError;

/// Repositories after validation, by name.
pub type RepositoryMap = IndexMap<String, FinalizedRepositoryConfig>;

/// Validate the whole config tree without rendering templates.
pub fn validate_config(config: &Config) -> Result<FinalizedConfig> {
    let defaults =
        validate_config_defaults(&config.default, &ConfigDefaults::default(), "default")?;

    let mut repositories = RepositoryMap::new();
    for (name, raw) in &config.repositories {
        repositories.insert(name.clone(), validate_repository_config(name, raw)?);
    }

    let mut containers = IndexMap::new();
    for (name, raw) in &config.containers {
        containers.insert(
            name.clone(),
            validate_container_config(name, raw, &defaults, &repositories)?,
        );
    }

    if containers.is_empty() {
        warn!("Config defines no containers");
    }

    Ok(FinalizedConfig {
        containers,
    })
}

/// Merge one defaults level over its parent and apply fallbacks.
///
/// Pass an empty [`ConfigDefaults`] as `parent` for the root level.
pub fn validate_config_defaults(
    child: &ConfigDefaults,
    parent: &ConfigDefaults,
    path: &str,
) -> Result<FinalizedDefaults> {
    let ci = merge_ci(child.ci.as_ref(), parent.ci.as_ref());

    let containerfile_path =
        pick_string(child.containerfile_path.as_ref(), parent.containerfile_path.as_ref())
            .unwrap_or_else(|| DEFAULT_CONTAINERFILE_PATH.to_string());
    let context_path = pick_string(child.context_path.as_ref(), parent.context_path.as_ref())
        .unwrap_or_else(|| DEFAULT_CONTEXT_PATH.to_string());
    let target = pick_string(child.target.as_ref(), parent.target.as_ref());

    let selected_build_args =
        [child.selected_build_args.as_ref(), parent.selected_build_args.as_ref()]
            .into_iter()
            .flatten()
            .find(|names| !names.is_empty())
            .cloned()
            .unwrap_or_default();

    let build_args =
        merge_build_args(child.build_args.as_ref(), parent.build_args.as_ref(), path)?;

    let platform_tag_templates = pick_list(
        child.platform_tag_templates.as_ref(),
        parent.platform_tag_templates.as_ref(),
    )
    .unwrap_or_else(|| vec![DEFAULT_PLATFORM_TAG_TEMPLATE.to_string()]);
    let manifest_tag_templates = pick_list(
        child.manifest_tag_templates.as_ref(),
        parent.manifest_tag_templates.as_ref(),
    )
    .unwrap_or_else(|| vec![DEFAULT_MANIFEST_TAG_TEMPLATE.to_string()]);
    let selected_repositories = pick_list(
        child.selected_repositories.as_ref(),
        parent.selected_repositories.as_ref(),
    )
    .unwrap_or_default();

    Ok(FinalizedDefaults {
        ci,
        containerfile_path,
        context_path,
        target,
        selected_build_args,
        build_args,
        platform_tag_templates,
        manifest_tag_templates,
        selected_repositories,
    })
}

/// Merge a single build argument over its parent definition.
///
/// Each source field is taken from the child when non-empty, else from the parent.
/// At least one source must remain. `orderPrecedence` is inherited from the parent
/// when the child does not set it and defaults to `[cmd, env_var, default]`.
pub fn validate_build_arg_config(
    child: Option<&BuildArgConfig>,
    parent: Option<&BuildArgConfig>,
    path: &str,
) -> Result<FinalizedBuildArgConfig> {
    let field = |get: fn(&BuildArgConfig) -> Option<&String>| {
        pick_string(child.and_then(get), parent.and_then(get))
    };

    let default = field(|arg| arg.default.as_ref());
    let cmd = field(|arg| arg.cmd.as_ref());
    let env_var = field(|arg| arg.env_var.as_ref());

    if default.is_none() && cmd.is_none() && env_var.is_none() {
        return Err(ContainerCiError::BuildArgConfig {
            path: path.to_string(),
            message: "at least one of default, cmd, env_var must be set".to_string(),
        }
        .into());
    }

    let requested = child
        .and_then(|arg| arg.order_precedence.as_ref())
        .or_else(|| parent.and_then(|arg| arg.order_precedence.as_ref()));
    let order_precedence = match requested {
        Some(tokens) => validate_precedence(tokens, path)?,
        None => BuildArgPrecedence::ALL.to_vec(),
    };

    let finalized = FinalizedBuildArgConfig {
        default,
        cmd,
        env_var,
        order_precedence,
    };

    if !finalized.order_precedence.iter().any(|kind| source_is_set(&finalized, *kind)) {
        warn!(
            "Build argument at '{}': orderPrecedence {:?} never consults a configured source",
            path,
            finalized.order_precedence.iter().map(|k| k.as_str()).collect::<Vec<_>>()
        );
    }

    Ok(finalized)
}

/// Check the required repository fields; missing credentials are only a warning.
pub fn validate_repository_config(
    name: &str,
    raw: &RepositoryConfig,
) -> Result<FinalizedRepositoryConfig> {
    let required = |field: &str, value: Option<&String>| -> Result<String> {
        non_empty(value).ok_or_else(|| {
            ContainerCiError::ConfigSchema {
                path: format!("repositories.{name}.{field}"),
                message: "is required".to_string(),
            }
            .into()
        })
    };

    let repository_type = required("type", raw.repository_type.as_ref())?;
    let registry = required("registry", raw.registry.as_ref())?;
    let repository = required("repository", raw.repository.as_ref())?;

    let username = non_empty(raw.username.as_ref());
    if username.is_none() {
        warn!("repositories.{}.username is not set, setting to null", name);
    }
    let password = non_empty(raw.password.as_ref());
    if password.is_none() {
        warn!("repositories.{}.password is not set, setting to null", name);
    }

    Ok(FinalizedRepositoryConfig {
        repository_type,
        registry,
        repository,
        username,
        password,
    })
}

/// Validate one platform entry against its container's finalized defaults.
pub fn validate_platform_config(
    raw: &PlatformConfig,
    container_defaults: &FinalizedDefaults,
    repositories: &RepositoryMap,
    os: PlatformOs,
    path: &str,
) -> Result<FinalizedPlatformConfig> {
    debug!("Validating {} platform config at '{}'", os, path);

    let mut own = raw.defaults.clone();
    if own.manifest_tag_templates.take().is_some() {
        warn!(
            "manifestTagTemplates should not be defined at platform level ('{}') - it will be ignored",
            path
        );
    }

    let merged = validate_config_defaults(&own, &ConfigDefaults::from(container_defaults), path)?;

    let mut selected_repositories = RepositoryMap::new();
    for name in &merged.selected_repositories {
        let repository = repositories.get(name).ok_or_else(|| ContainerCiError::RepositoryNotFound {
            name: name.clone(),
        })?;
        selected_repositories.insert(name.clone(), repository.clone());
    }

    for name in &merged.selected_build_args {
        if !merged.build_args.contains_key(name) {
            warn!("Selected build argument '{}' at '{}' is not defined", name, path);
        }
    }
    let build_args = merged
        .build_args
        .into_iter()
        .filter(|(name, _)| merged.selected_build_args.contains(name))
        .collect();

    let platform_slug = non_empty(raw.platform_slug.as_ref());
    let arch = non_empty(raw.arch.as_ref()).or_else(|| match os {
        PlatformOs::Linux => platform_slug.as_deref().map(derive_arch),
        PlatformOs::Windows => None,
    });

    Ok(FinalizedPlatformConfig {
        containerfile_path: merged.containerfile_path,
        context_path: merged.context_path,
        target: merged.target,
        ci: merged.ci,
        platform_slug,
        arch,
        build_args,
        platform_tag_templates: merged.platform_tag_templates,
        repositories: selected_repositories,
    })
}

/// Validate one container: its defaults, tag templates and every platform.
pub fn validate_container_config(
    name: &str,
    raw: &ContainerConfig,
    global_defaults: &FinalizedDefaults,
    repositories: &RepositoryMap,
) -> Result<FinalizedContainerConfig> {
    debug!("Validating container config '{}'", name);
    let path = format!("containers.{name}");

    let defaults = validate_config_defaults(
        &raw.default,
        &ConfigDefaults::from(global_defaults),
        &format!("{path}.default"),
    )?;

    let manifest_tag_templates = raw
        .manifest_tag_templates
        .clone()
        .unwrap_or_else(|| defaults.manifest_tag_templates.clone());

    if defaults.platform_tag_templates.is_empty() {
        warn!("{}.default.platformTagTemplates is empty", path);
    }
    if manifest_tag_templates.is_empty() {
        warn!("{}.manifestTagTemplates is empty", path);
    }
    if defaults.platform_tag_templates.is_empty() && manifest_tag_templates.is_empty() {
        return Err(ContainerCiError::NoTagTemplates {
            container: name.to_string(),
        }
        .into());
    }

    let validate_platforms = |platforms: &IndexMap<String, PlatformConfig>, os: PlatformOs| {
        let section = match os {
            PlatformOs::Linux => "linuxPlatforms",
            PlatformOs::Windows => "windowsPlatforms",
        };
        platforms
            .iter()
            .map(|(key, platform)| {
                let platform_path = format!("{path}.{section}.{key}");
                validate_platform_config(platform, &defaults, repositories, os, &platform_path)
                    .map(|finalized| (key.clone(), finalized))
            })
            .collect::<Result<IndexMap<_, _>>>()
    };

    let linux_platforms = validate_platforms(&raw.linux_platforms, PlatformOs::Linux)?;
    let windows_platforms = validate_platforms(&raw.windows_platforms, PlatformOs::Windows)?;

    if linux_platforms.is_empty() && windows_platforms.is_empty() {
        return Err(ContainerCiError::NoPlatforms {
            container: name.to_string(),
        }
        .into());
    }

    Ok(FinalizedContainerConfig {
        manifest_tag_templates,
        linux_platforms,
        windows_platforms,
    })
}

/// `linux/arm64` → `arm64`; slugs without the prefix are used as-is.
pub fn derive_arch(platform_slug: &str) -> String {
    platform_slug.strip_prefix(LINUX_PLATFORM_PREFIX).unwrap_or(platform_slug).to_string()
}

fn validate_precedence(tokens: &[String], path: &str) -> Result<Vec<BuildArgPrecedence>> {
    if tokens.is_empty() {
        warn!(
            "Build argument at '{}' has an empty orderPrecedence, using cmd, env_var, default",
            path
        );
        return Ok(BuildArgPrecedence::ALL.to_vec());
    }

    let mut order = Vec::with_capacity(tokens.len());
    for token in tokens {
        let kind: BuildArgPrecedence =
            token.parse().map_err(|message| ContainerCiError::BuildArgConfig {
                path: path.to_string(),
                message,
            })?;
        if order.contains(&kind) {
            warn!(
                "Build argument at '{}' lists '{}' more than once in orderPrecedence",
                path, kind
            );
        } else {
            order.push(kind);
        }
    }
    Ok(order)
}

fn source_is_set(arg: &FinalizedBuildArgConfig, kind: BuildArgPrecedence) -> bool {
    match kind {
        BuildArgPrecedence::Cmd => arg.cmd.is_some(),
        BuildArgPrecedence::EnvVar => arg.env_var.is_some(),
        BuildArgPrecedence::Default => arg.default.is_some(),
    }
}

fn merge_ci(child: Option<&CiConfig>, parent: Option<&CiConfig>) -> CiConfig {
    let mut merged = parent.cloned().unwrap_or_default();
    for (key, value) in child.into_iter().flatten() {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn merge_build_args(
    child: Option<&IndexMap<String, BuildArgConfig>>,
    parent: Option<&IndexMap<String, BuildArgConfig>>,
    path: &str,
) -> Result<IndexMap<String, FinalizedBuildArgConfig>> {
    let mut merged = IndexMap::new();
    let keys = child.into_iter().flatten().chain(parent.into_iter().flatten()).map(|(k, _)| k);

    for key in keys {
        if merged.contains_key(key) {
            continue;
        }
        let arg = validate_build_arg_config(
            child.and_then(|args| args.get(key)),
            parent.and_then(|args| args.get(key)),
            &format!("{path}.buildArgs.{key}"),
        )?;
        merged.insert(key.clone(), arg);
    }
    Ok(merged)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

fn pick_string(child: Option<&String>, parent: Option<&String>) -> Option<String> {
    non_empty(child).or_else(|| non_empty(parent))
}

fn pick_list(child: Option<&Vec<String>>, parent: Option<&Vec<String>>) -> Option<Vec<String>> {
    child.or(parent).cloned()
}

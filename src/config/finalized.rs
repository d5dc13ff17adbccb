//! Finalized config types.
//!
//! Produced only by [`super::validate_config`] and [`super::resolve_config`]; every
//! inherited field carries a concrete value. These are also the shapes emitted as
//! the `finalizedContainerConfig` output and embedded in matrix rows, so they
//! serialize and deserialize with the document's field names.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::types::{BuildArgPrecedence, CiConfig};

/// A build argument after merging and precedence validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedBuildArgConfig {
    /// Literal value
    pub default: Option<String>,
    /// Shell command whose trimmed stdout is the value
    pub cmd: Option<String>,
    /// Environment variable to read
    pub env_var: Option<String>,
    /// Order in which sources are tried
    #[serde(rename = "orderPrecedence")]
    pub order_precedence: Vec<BuildArgPrecedence>,
}

/// Settings of one level after merging with its parent and applying fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedDefaults {
    pub ci: CiConfig,
    pub containerfile_path: String,
    pub context_path: String,
    pub target: Option<String>,
    pub selected_build_args: Vec<String>,
    pub build_args: IndexMap<String, FinalizedBuildArgConfig>,
    pub platform_tag_templates: Vec<String>,
    pub manifest_tag_templates: Vec<String>,
    pub selected_repositories: Vec<String>,
}

/// A repository with its required fields checked.
///
/// `username` and `password` are still templates at this point; they are rendered
/// at login time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedRepositoryConfig {
    #[serde(rename = "type")]
    pub repository_type: String,
    pub registry: String,
    pub repository: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl FinalizedRepositoryConfig {
    /// Full image reference for `tag` in this repository.
    pub fn image_ref(&self, tag: &str) -> String {
        format!("{}/{}:{}", self.registry, self.repository, tag)
    }
}

/// A platform entry ready to be turned into a matrix row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedPlatformConfig {
    pub containerfile_path: String,
    pub context_path: String,
    pub target: Option<String>,
    pub ci: CiConfig,
    #[serde(rename = "platform_slug")]
    pub platform_slug: Option<String>,
    pub arch: Option<String>,
    /// Only the build arguments selected for this platform
    pub build_args: IndexMap<String, FinalizedBuildArgConfig>,
    pub platform_tag_templates: Vec<String>,
    /// Selected repositories, by name
    pub repositories: IndexMap<String, FinalizedRepositoryConfig>,
}

/// One container after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedContainerConfig {
    pub manifest_tag_templates: Vec<String>,
    pub linux_platforms: IndexMap<String, FinalizedPlatformConfig>,
    pub windows_platforms: IndexMap<String, FinalizedPlatformConfig>,
}

impl FinalizedContainerConfig {
    /// Repositories the container's manifests are pushed to.
    ///
    /// The first non-empty `repositories` mapping found scanning Linux platforms,
    /// then Windows platforms, in declaration order.
    pub fn manifest_repositories(&self) -> Option<&IndexMap<String, FinalizedRepositoryConfig>> {
        self.linux_platforms
            .values()
            .chain(self.windows_platforms.values())
            .map(|platform| &platform.repositories)
            .find(|repositories| !repositories.is_empty())
    }
}

/// Container name → finalized container, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalizedConfig {
    pub containers: IndexMap<String, FinalizedContainerConfig>,
}

impl FinalizedConfig {
    pub fn get(&self, container_name: &str) -> Option<&FinalizedContainerConfig> {
        self.containers.get(container_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FinalizedContainerConfig)> {
        self.containers.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }
}

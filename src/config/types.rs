//! Raw config document types.
//!
//! These mirror the document a pipeline author writes: every field is optional and
//! absence means "inherit from the parent level". Validation turns them into the
//! types of [`super::finalized`].

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use super::finalized::{FinalizedBuildArgConfig, FinalizedDefaults};

/// A CI metadata value: string, string array, number, boolean or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "serde_json::Value")]
pub enum CiValue {
    /// Boolean flag
    Bool(bool),
    /// Integer or float
    Number(serde_json::Number),
    /// Plain string
    String(String),
    /// List of strings
    List(Vec<String>),
    /// Explicit null
    Null,
}

impl TryFrom<serde_json::Value> for CiValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => Ok(Self::Number(n)),
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(format!("ci list values must be strings, found {other}")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(_) => Err(
                "ci values must be a string, string array, number, boolean or null".to_string()
            ),
        }
    }
}

/// CI metadata: arbitrary key-value pairs passed through to the job.
pub type CiConfig = IndexMap<String, CiValue>;

/// Source of a build argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildArgPrecedence {
    /// Run `cmd` and use its trimmed stdout
    Cmd,
    /// Read the environment variable named by `env_var`
    EnvVar,
    /// Use the literal `default`
    Default,
}

impl BuildArgPrecedence {
    /// Every precedence kind, in the default resolution order.
    pub const ALL: [Self; 3] = [Self::Cmd, Self::EnvVar, Self::Default];

    /// The token used in config documents.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cmd => "cmd",
            Self::EnvVar => "env_var",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for BuildArgPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildArgPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s).ok_or_else(|| {
            format!("Invalid orderPrecedence value: {s}. Must be one of: cmd, env_var, default")
        })
    }
}

/// Where one build argument's value can come from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildArgConfig {
    /// Literal value; numbers and booleans are stringified
    #[serde(
        default,
        deserialize_with = "deserialize_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    /// Shell command whose stdout is the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Environment variable to read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    /// Order in which the sources are tried; tokens are checked during validation
    #[serde(default, rename = "orderPrecedence", skip_serializing_if = "Option::is_none")]
    pub order_precedence: Option<Vec<String>>,
}

impl From<&FinalizedBuildArgConfig> for BuildArgConfig {
    fn from(finalized: &FinalizedBuildArgConfig) -> Self {
        Self {
            default: finalized.default.clone(),
            cmd: finalized.cmd.clone(),
            env_var: finalized.env_var.clone(),
            order_precedence: Some(
                finalized.order_precedence.iter().map(|p| p.as_str().to_string()).collect(),
            ),
        }
    }
}

/// Inheritable settings shared by the root, container and platform levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDefaults {
    /// CI metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ci: Option<CiConfig>,
    /// Path to the Containerfile / Dockerfile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containerfile_path: Option<String>,
    /// Build context directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_path: Option<String>,
    /// Build target stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Names of the build arguments a platform uses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_build_args: Option<Vec<String>>,
    /// Build argument definitions by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_args: Option<IndexMap<String, BuildArgConfig>>,
    /// Per-platform image tag templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_tag_templates: Option<Vec<String>>,
    /// Manifest list tag templates (container level only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_tag_templates: Option<Vec<String>>,
    /// Names of the global repositories to publish to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_repositories: Option<Vec<String>>,
}

impl From<&FinalizedDefaults> for ConfigDefaults {
    fn from(finalized: &FinalizedDefaults) -> Self {
        Self {
            ci: Some(finalized.ci.clone()),
            containerfile_path: Some(finalized.containerfile_path.clone()),
            context_path: Some(finalized.context_path.clone()),
            target: finalized.target.clone(),
            selected_build_args: Some(finalized.selected_build_args.clone()),
            build_args: Some(
                finalized.build_args.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            ),
            platform_tag_templates: Some(finalized.platform_tag_templates.clone()),
            manifest_tag_templates: Some(finalized.manifest_tag_templates.clone()),
            selected_repositories: Some(finalized.selected_repositories.clone()),
        }
    }
}

/// One artifact registry target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Login strategy name (`standard`)
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub repository_type: Option<String>,
    /// Registry host, e.g. `ghcr.io`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Repository path inside the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Username template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Operating system family of a platform entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformOs {
    Linux,
    Windows,
}

impl PlatformOs {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for PlatformOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One build target (Linux or Windows).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PlatformDocument")]
pub struct PlatformConfig {
    /// Inherited settings overridden at this platform
    #[serde(flatten)]
    pub defaults: ConfigDefaults,
    /// Engine platform identifier, e.g. `linux/amd64`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_slug: Option<String>,
    /// Architecture; derived from `platform_slug` on Linux when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// A platform entry as written in a config document.
///
/// Must not flatten [`ConfigDefaults`]: flattened fields lose their key path in
/// type errors.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformDocument {
    ci: Option<CiConfig>,
    containerfile_path: Option<String>,
    context_path: Option<String>,
    target: Option<String>,
    selected_build_args: Option<Vec<String>>,
    build_args: Option<IndexMap<String, BuildArgConfig>>,
    platform_tag_templates: Option<Vec<String>>,
    manifest_tag_templates: Option<Vec<String>>,
    selected_repositories: Option<Vec<String>>,
    #[serde(rename = "platform_slug")]
    platform_slug: Option<String>,
    arch: Option<String>,
}

impl From<PlatformDocument> for PlatformConfig {
    fn from(document: PlatformDocument) -> Self {
        Self {
            defaults: ConfigDefaults {
                ci: document.ci,
                containerfile_path: document.containerfile_path,
                context_path: document.context_path,
                target: document.target,
                selected_build_args: document.selected_build_args,
                build_args: document.build_args,
                platform_tag_templates: document.platform_tag_templates,
                manifest_tag_templates: document.manifest_tag_templates,
                selected_repositories: document.selected_repositories,
            },
            platform_slug: document.platform_slug,
            arch: document.arch,
        }
    }
}

/// One logical multi-platform image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    /// Container-wide defaults
    #[serde(default)]
    pub default: ConfigDefaults,
    /// Manifest tag templates; overrides `default.manifestTagTemplates`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_tag_templates: Option<Vec<String>>,
    /// Linux platforms keyed by platform identifier
    #[serde(default)]
    pub linux_platforms: IndexMap<String, PlatformConfig>,
    /// Windows platforms keyed by platform identifier
    #[serde(default)]
    pub windows_platforms: IndexMap<String, PlatformConfig>,
}

/// The config document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Global defaults
    #[serde(default)]
    pub default: ConfigDefaults,
    /// Repositories by name
    #[serde(default)]
    pub repositories: IndexMap<String, RepositoryConfig>,
    /// Containers by name
    #[serde(default)]
    pub containers: IndexMap<String, ContainerConfig>,
}

/// Accept a string, number or boolean and keep it as a string.
fn deserialize_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "build argument default must be a string, number or boolean, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ci_value_accepts_supported_shapes() {
        let ci: CiConfig = serde_json::from_str(
            r#"{"a": "x", "b": true, "c": 3, "d": ["x", "y"], "e": null}"#,
        )
        .unwrap();
        assert_eq!(ci["a"], CiValue::String("x".into()));
        assert_eq!(ci["b"], CiValue::Bool(true));
        assert_eq!(ci["c"], CiValue::Number(3.into()));
        assert_eq!(ci["d"], CiValue::List(vec!["x".into(), "y".into()]));
        assert_eq!(ci["e"], CiValue::Null);
    }

    #[test]
    fn test_ci_value_rejects_objects_and_mixed_lists() {
        let err = serde_json::from_str::<CiConfig>(r#"{"a": {"nested": 1}}"#).unwrap_err();
        assert!(err.to_string().contains("string array"));

        let err = serde_json::from_str::<CiConfig>(r#"{"a": ["x", 1]}"#).unwrap_err();
        assert!(err.to_string().contains("must be strings"));
    }

    #[test]
    fn test_ci_value_serializes_untagged() {
        let value = CiValue::List(vec!["a".into()]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"["a"]"#);
        assert_eq!(serde_json::to_string(&CiValue::Null).unwrap(), "null");
    }

    #[test]
    fn test_build_arg_default_is_stringified() {
        let arg: BuildArgConfig = serde_json::from_str(r#"{"default": 18}"#).unwrap();
        assert_eq!(arg.default.as_deref(), Some("18"));

        let arg: BuildArgConfig = toml::from_str("default = true").unwrap();
        assert_eq!(arg.default.as_deref(), Some("true"));
    }

    #[test]
    fn test_precedence_tokens() {
        assert_eq!("env_var".parse::<BuildArgPrecedence>(), Ok(BuildArgPrecedence::EnvVar));
        assert!("envvar".parse::<BuildArgPrecedence>().unwrap_err().contains("envvar"));
    }

    #[test]
    fn test_platform_fields_use_document_names() {
        let platform: PlatformConfig = serde_json::from_str(
            r#"{"platform_slug": "linux/arm64", "containerfilePath": "Dockerfile", "selectedRepositories": ["ghcr"]}"#,
        )
        .unwrap();
        assert_eq!(platform.platform_slug.as_deref(), Some("linux/arm64"));
        assert_eq!(platform.defaults.containerfile_path.as_deref(), Some("Dockerfile"));
        assert_eq!(platform.defaults.selected_repositories, Some(vec!["ghcr".to_string()]));
    }
}

//! Test fixtures for creating sample configs and build outputs

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{BuildInfo, BuildOutput};
use crate::config::{ConfigFormat, FinalizedPlatformConfig, PlatformOs};
use crate::constants::BUILD_OUTPUT_FILE_NAME;
use crate::matrix::JobInclude;

/// Test fixture for sample config documents
#[derive(Clone, Debug)]
pub struct ConfigFixture {
    pub content: String,
    pub format: ConfigFormat,
}

impl ConfigFixture {
    /// One container, one repository, two Linux platforms and a Windows platform
    pub fn basic() -> Self {
        Self {
            format: ConfigFormat::Toml,
            content: r#"
[default]
selectedRepositories = ["ghcr"]
platformTagTemplates = ["{{ CONTAINER_NAME }}-{{ ARCH }}-{{ GITHUB_RUN_ID }}"]
manifestTagTemplates = ["{{ CONTAINER_NAME }}-{{ GITHUB_RUN_ID }}"]

[repositories.ghcr]
type = "standard"
registry = "ghcr.io"
repository = "org/{{ CONTAINER_NAME }}"
username = "{{ env.GITHUB_ACTOR }}"
password = "{{ env.GITHUB_TOKEN }}"

[containers.app.default]
selectedBuildArgs = ["VERSION"]

[containers.app.default.buildArgs.VERSION]
default = "1.0.0"

[containers.app.linuxPlatforms.amd64]
platform_slug = "linux/amd64"

[containers.app.linuxPlatforms.arm64]
platform_slug = "linux/arm64"

[containers.app.windowsPlatforms.ltsc2022]
containerfilePath = "${GIT_PROJECT_ROOT}/Containerfile.windows"
arch = "amd64"
"#
            .trim()
            .to_string(),
        }
    }

    /// Two containers sharing the global defaults
    pub fn multi_container() -> Self {
        Self {
            format: ConfigFormat::Toml,
            content: r#"
[default]
selectedRepositories = ["ghcr"]

[repositories.ghcr]
type = "standard"
registry = "ghcr.io"
repository = "org/{{ CONTAINER_NAME }}"

[containers.api.linuxPlatforms.amd64]
platform_slug = "linux/amd64"

[containers.worker.linuxPlatforms.amd64]
platform_slug = "linux/amd64"
target = "runtime"
"#
            .trim()
            .to_string(),
        }
    }

    /// The basic container as a YAML document
    pub fn yaml() -> Self {
        Self {
            format: ConfigFormat::Yaml,
            content: r"
repositories:
  ghcr:
    type: standard
    registry: ghcr.io
    repository: org/app
containers:
  app:
    default:
      selectedRepositories: [ghcr]
    linuxPlatforms:
      amd64:
        platform_slug: linux/amd64
"
            .trim()
            .to_string(),
        }
    }

    /// The basic container as a JSON document
    pub fn json() -> Self {
        Self {
            format: ConfigFormat::Json,
            content: r#"{
  "containers": {
    "app": {
      "linuxPlatforms": {
        "amd64": { "platform_slug": "linux/amd64" }
      }
    }
  }
}"#
            .to_string(),
        }
    }

    /// A container whose platform selects an undefined repository
    pub fn unknown_repository() -> Self {
        Self {
            format: ConfigFormat::Toml,
            content: r#"
[containers.app.default]
selectedRepositories = ["dockerhub"]

[containers.app.linuxPlatforms.amd64]
platform_slug = "linux/amd64"
"#
            .trim()
            .to_string(),
        }
    }

    /// Write the fixture into `dir` under `name`
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, &self.content)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}

/// Build output record for `container` built on `slug`
pub fn build_output(container: &str, slug: &str, primary_tag: &str) -> BuildOutput {
    let arch = slug.trim_start_matches("linux/").to_string();
    BuildOutput {
        config: JobInclude {
            job: format!("linux-{container}-{arch}"),
            container_name: container.to_string(),
            os: PlatformOs::Linux,
            platform: FinalizedPlatformConfig {
                platform_slug: Some(slug.to_string()),
                arch: Some(arch),
                ..Default::default()
            },
        },
        build_info: BuildInfo {
            primary_tag: primary_tag.to_string(),
            tags: vec![primary_tag.to_string()],
            total_tags: 1,
            build_args: IndexMap::new(),
            target: None,
            platform: Some(slug.to_string()),
            builder_os: "linux".to_string(),
            builder_arch: "x86_64".to_string(),
        },
    }
}

/// Write `output` as `<workspace>/<dir_name>/buildOutput.json`
pub fn write_build_output(
    workspace: &Path,
    dir_name: &str,
    output: &BuildOutput,
) -> Result<PathBuf> {
    let dir = workspace.join(dir_name);
    fs::create_dir_all(&dir)?;
    let path = dir.join(BUILD_OUTPUT_FILE_NAME);
    fs::write(&path, serde_json::to_string_pretty(output)?)?;
    Ok(path)
}

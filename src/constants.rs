//! Global constants used throughout the containerci codebase.
//!
//! Fallback values for the config cascade, environment variable names the tool
//! reads, and the file names exchanged between CI jobs live here so they are
//! discoverable in one place.

use std::time::Duration;

/// Fallback containerfile path when no config level sets `containerfilePath`.
pub const DEFAULT_CONTAINERFILE_PATH: &str = "${GIT_PROJECT_ROOT}/Containerfile";

/// Fallback build context when no config level sets `contextPath`.
pub const DEFAULT_CONTEXT_PATH: &str = "${GIT_PROJECT_ROOT}";

/// Fallback platform tag template.
pub const DEFAULT_PLATFORM_TAG_TEMPLATE: &str =
    "{{CONTAINER_NAME}}-{{ARCH}}-{{GITHUB_RUN_ID}}-{{GITHUB_RUN_NUMBER}}";

/// Fallback manifest tag template.
pub const DEFAULT_MANIFEST_TAG_TEMPLATE: &str =
    "{{CONTAINER_NAME}}-{{GITHUB_RUN_ID}}-{{GITHUB_RUN_NUMBER}}";

/// Prefix stripped from `platform_slug` to derive `arch`.
pub const LINUX_PLATFORM_PREFIX: &str = "linux/";

/// File written by every build job and read back by the combine modes.
pub const BUILD_OUTPUT_FILE_NAME: &str = "buildOutput.json";

/// Container engine binary used when none is configured.
pub const DEFAULT_CONTAINER_ENGINE: &str = "docker";

/// Environment variable overriding the container engine binary.
pub const CONTAINER_ENGINE_ENV: &str = "CONTAINER_ENGINE";

/// CI workspace directory; also the source root override.
pub const GITHUB_WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";

/// Token that must be present for build mode to run.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment switch that disables pushing.
pub const SKIP_PUSH_ENV: &str = "SKIP_PUSH";

/// File the CI platform reads step outputs from.
pub const GITHUB_OUTPUT_ENV: &str = "GITHUB_OUTPUT";

/// File the CI platform renders as the job summary.
pub const GITHUB_STEP_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

/// Template variable holding the discovered source root.
pub const GIT_PROJECT_ROOT_VAR: &str = "GIT_PROJECT_ROOT";

/// Template variable holding the container name.
pub const CONTAINER_NAME_VAR: &str = "CONTAINER_NAME";

/// Template variable holding the platform architecture.
pub const ARCH_VAR: &str = "ARCH";

/// Template variable holding the platform slug.
pub const PLATFORM_SLUG_VAR: &str = "PLATFORM_SLUG";

/// Template variable holding the matrix job key.
pub const JOB_VAR: &str = "JOB";

/// Timeout for git invocations used during source root discovery.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

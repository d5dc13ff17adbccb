//! containerci - multi-platform container builds driven by a declarative config
//!
//! A single config document describes containers, the platforms each is built
//! for, the registries images are pushed to and how build arguments are
//! resolved. The tool runs inside a CI pipeline in four stages:
//!
//! 1. **generate-matrix** validates the config, merges defaults down the
//!    global → container → platform cascade and emits one CI job per platform
//! 2. **build** runs on each job: it resolves build arguments, logs in, builds,
//!    tags and pushes the platform image, then records a `buildOutput.json`
//! 3. **combine-build-outputs** gathers the build records of all jobs
//! 4. **create-manifest** creates and pushes one manifest list per
//!    repository and manifest tag, referencing every platform image
//!
//! # Config Example
//!
//! ```toml
//! [default]
//! selectedRepositories = ["ghcr"]
//! platformTagTemplates = ["{{ CONTAINER_NAME }}-{{ ARCH }}-{{ GITHUB_RUN_ID }}"]
//! manifestTagTemplates = ["{{ CONTAINER_NAME }}-{{ GITHUB_RUN_ID }}", "latest"]
//!
//! [repositories.ghcr]
//! type = "standard"
//! registry = "ghcr.io"
//! repository = "org/{{ CONTAINER_NAME }}"
//! username = "{{ env.GITHUB_ACTOR }}"
//! password = "{{ env.GITHUB_TOKEN }}"
//!
//! [containers.app.default.buildArgs.VERSION]
//! cmd = "git describe --tags"
//! default = "dev"
//! orderPrecedence = ["cmd", "default"]
//!
//! [containers.app.linuxPlatforms.amd64]
//! platform_slug = "linux/amd64"
//!
//! [containers.app.linuxPlatforms.arm64]
//! platform_slug = "linux/arm64"
//! ```
//!
//! # Modules
//!
//! - [`config`] - config types, parsing, validation and resolution
//! - [`matrix`] - CI job matrix expansion
//! - [`build`] - build argument resolution and the per-job build
//! - [`manifest_list`] - multi-platform manifest creation
//! - [`repository`] - registry login strategies
//! - [`engine`] - container engine invocations and external process execution
//! - [`templating`] - template variables and rendering
//! - [`ci`] - step outputs, secret masking and step summaries
//! - [`git`] - source root discovery
//! - [`modes`] - the four run modes
//! - [`cli`] - command-line entry point
//! - [`core`] - error types

pub mod build;
pub mod ci;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod git;
pub mod manifest_list;
pub mod matrix;
pub mod modes;
pub mod repository;
pub mod templating;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

//! Common test utilities for containerci integration tests
//!
//! [`TestWorkspace`] owns a temporary CI workspace with its own step output and
//! step summary files, and runs the `containerci` binary against it with a
//! clean environment.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use containerci_cli::ci::parse_output_file;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary CI workspace
pub struct TestWorkspace {
    temp_dir: TempDir,
    root: PathBuf,
    output_file: PathBuf,
    summary_file: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("workspace");
        fs::create_dir_all(&root)?;
        let output_file = temp_dir.path().join("github_output");
        let summary_file = temp_dir.path().join("step_summary.md");

        Ok(Self {
            temp_dir,
            root,
            output_file,
            summary_file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write a file relative to the workspace root
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// `containerci` with only the CI variables of this workspace set
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("containerci").expect("binary is built");
        cmd.env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("GITHUB_WORKSPACE", &self.root)
            .env("GITHUB_OUTPUT", &self.output_file)
            .env("GITHUB_STEP_SUMMARY", &self.summary_file)
            .env("GITHUB_RUN_ID", "42")
            .env("GITHUB_RUN_NUMBER", "7")
            .env("NO_COLOR", "1")
            .current_dir(&self.root);
        cmd
    }

    /// Every step output written so far, in order
    pub fn outputs(&self) -> Vec<(String, String)> {
        fs::read_to_string(&self.output_file)
            .map(|content| parse_output_file(&content))
            .unwrap_or_default()
    }

    /// The last value written for the output `name`
    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs().into_iter().rev().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    /// The output `name` parsed as JSON
    pub fn json_output(&self, name: &str) -> serde_json::Value {
        let raw = self.output(name).unwrap_or_else(|| panic!("output {name} was not set"));
        serde_json::from_str(&raw).expect("output is JSON")
    }

    pub fn summary(&self) -> String {
        fs::read_to_string(&self.summary_file).unwrap_or_default()
    }

    /// Install a stand-in container engine that appends each invocation to
    /// `engine.log` and succeeds. Returns the script path for `--engine`.
    #[cfg(unix)]
    pub fn install_fake_engine(&self) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let log = self.engine_log_path();
        let script = self.temp_dir.path().join("fake-engine");
        fs::write(&script, format!("#!/bin/sh\necho \"$@\" >> '{}'\n", log.display()))?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;
        Ok(script)
    }

    fn engine_log_path(&self) -> PathBuf {
        self.temp_dir.path().join("engine.log")
    }

    /// Engine invocations recorded by the fake engine, one line each
    pub fn engine_log(&self) -> Vec<String> {
        fs::read_to_string(self.engine_log_path())
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Config used by the end-to-end tests: one container, two Linux platforms, one
/// repository with credentials from the environment
pub const PIPELINE_CONFIG: &str = r#"
[default]
selectedRepositories = ["ghcr"]
platformTagTemplates = ["{{ CONTAINER_NAME }}-{{ ARCH }}-{{ GITHUB_RUN_ID }}"]
manifestTagTemplates = ["{{ CONTAINER_NAME }}-{{ GITHUB_RUN_ID }}", "latest"]

[repositories.ghcr]
type = "standard"
registry = "ghcr.io"
repository = "org/{{ CONTAINER_NAME }}"
username = "bot"
password = "{{ env.GITHUB_TOKEN }}"

[containers.app.default]
selectedBuildArgs = ["VERSION"]

[containers.app.default.buildArgs.VERSION]
env_var = "APP_VERSION"
default = "0.0.0"
orderPrecedence = ["env_var", "default"]

[containers.app.linuxPlatforms.amd64]
platform_slug = "linux/amd64"

[containers.app.linuxPlatforms.arm64]
platform_slug = "linux/arm64"
"#;

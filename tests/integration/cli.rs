//! Binary-level input handling.

use predicates::prelude::*;

use crate::common::{PIPELINE_CONFIG, TestWorkspace};

#[test]
fn test_help_lists_modes() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--config-format"));
}

#[test]
fn test_invalid_mode_is_rejected() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .env("INPUT_MODE", "combine-manifest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'combine-manifest'"));
}

#[test]
fn test_config_format_is_required() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .env("INPUT_MODE", "generate-matrix")
        .env("INPUT_CONFIG", PIPELINE_CONFIG)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid input 'config-format'"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .args(["--mode", "generate-matrix", "--config-format", "toml"])
        .args(["--config-file", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file does not exist"));
}

#[test]
fn test_build_requires_github_token() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .args(["--mode", "build", "--config", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Required environment variable GITHUB_TOKEN is not set"));
}

#[test]
fn test_combine_requires_prefix() {
    let workspace = TestWorkspace::new().unwrap();
    workspace
        .command()
        .args(["--mode", "combine-build-outputs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build-output-artifact-name-prefix"));
}

#[test]
fn test_unknown_repository_fails_matrix_generation() {
    let workspace = TestWorkspace::new().unwrap();
    let config = r#"
[containers.app.default]
selectedRepositories = ["dockerhub"]

[containers.app.linuxPlatforms.amd64]
platform_slug = "linux/amd64"
"#;
    workspace
        .command()
        .args(["--mode", "generate-matrix", "--config-format", "toml", "--config", config])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository dockerhub not found"));
    assert!(workspace.output("jobMatrix").is_none());
}

//! The four modes run back to back through the binary, with a stand-in engine.

#![cfg(unix)]

use predicates::prelude::*;
use serde_json::Value;

use crate::common::{PIPELINE_CONFIG, TestWorkspace};

const PREFIX: &str = "build-output-";

fn generate_matrix(workspace: &TestWorkspace) -> Value {
    workspace
        .command()
        .args(["--mode", "generate-matrix", "--config-format", "toml", "--config", PIPELINE_CONFIG])
        .assert()
        .success();
    workspace.json_output("jobMatrix")
}

#[test]
fn test_generate_matrix_outputs() {
    let workspace = TestWorkspace::new().unwrap();
    let matrix = generate_matrix(&workspace);

    assert_eq!(matrix["job"], serde_json::json!(["linux-app-amd64", "linux-app-arm64"]));
    assert_eq!(matrix["include"][1]["arch"], "arm64");
    assert_eq!(matrix["include"][1]["containerName"], "app");

    let linux = workspace.json_output("linuxMatrix");
    assert_eq!(linux, matrix);
    assert!(workspace.output("windowsMatrix").is_none());

    let finalized = workspace.json_output("finalizedContainerConfig");
    let root = workspace.path().to_string_lossy().to_string();
    assert_eq!(finalized["app"]["linuxPlatforms"]["amd64"]["contextPath"], Value::String(root));
    assert!(workspace.summary().contains("## 🧮 Build Matrix"));
}

#[test]
fn test_build_each_row_then_combine_and_create_manifests() {
    let workspace = TestWorkspace::new().unwrap();
    let engine = workspace.install_fake_engine().unwrap();
    let engine = engine.to_string_lossy().to_string();
    let matrix = generate_matrix(&workspace);

    for row in matrix["include"].as_array().unwrap() {
        let row = row.to_string();
        workspace
            .command()
            .env("GITHUB_TOKEN", "t0ken")
            .env("APP_VERSION", "2.0")
            .args(["--mode", "build", "--engine", engine.as_str()])
            .args(["--build-output-artifact-name-prefix", PREFIX, "--config", row.as_str()])
            .assert()
            .success()
            .stdout(predicate::str::contains("::add-mask::t0ken"));
    }

    let build_path = workspace.output("build-output-json-path").unwrap();
    assert!(build_path.ends_with("build-output-linux-app-arm64/buildOutput.json"));
    let build_output = workspace.json_output("build-output-json");
    assert_eq!(build_output["buildInfo"]["primaryTag"], "ghcr.io/org/app:app-arm64-42");
    assert_eq!(build_output["buildInfo"]["buildArgs"]["VERSION"], "2.0");

    let root = workspace.path().display().to_string();
    let log = workspace.engine_log();
    assert_eq!(log[0], "login ghcr.io -u bot -p t0ken");
    assert_eq!(
        log[1],
        format!(
            "build -f {root}/Containerfile -t ghcr.io/org/app:app-amd64-42 --build-arg VERSION=2.0 --platform linux/amd64 {root}"
        )
    );
    assert_eq!(log[2], "push ghcr.io/org/app:app-amd64-42");

    workspace
        .command()
        .args(["--mode", "combine-build-outputs", "--build-output-artifact-name-prefix", PREFIX])
        .assert()
        .success();
    let combined = workspace.json_output("build-output-json");
    let keys: Vec<_> = combined.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["linux-app-amd64", "linux-app-arm64"]);
    assert!(
        workspace.summary().contains("| `linux/arm64` | `ghcr.io/org/app:app-arm64-42` | 1 | - |")
    );

    workspace
        .command()
        .env("GITHUB_TOKEN", "t0ken")
        .args(["--mode", "create-manifest", "--engine", engine.as_str()])
        .args(["--config-format", "toml"])
        .args(["--config", PIPELINE_CONFIG, "--build-outputs", combined.to_string().as_str()])
        .assert()
        .success();

    let log = workspace.engine_log();
    let manifest_lines: Vec<_> = log.iter().filter(|line| line.starts_with("manifest")).collect();
    assert_eq!(
        manifest_lines,
        vec![
            "manifest create ghcr.io/org/app:app-42 ghcr.io/org/app:app-amd64-42 ghcr.io/org/app:app-arm64-42",
            "manifest push ghcr.io/org/app:app-42",
            "manifest create ghcr.io/org/app:latest ghcr.io/org/app:app-amd64-42 ghcr.io/org/app:app-arm64-42",
            "manifest push ghcr.io/org/app:latest",
        ]
    );
    assert!(workspace.summary().contains("### 📦 Container: app"));
}

#[test]
fn test_skip_push_builds_without_login() {
    let workspace = TestWorkspace::new().unwrap();
    let engine = workspace.install_fake_engine().unwrap().to_string_lossy().to_string();
    let matrix = generate_matrix(&workspace);
    let row = matrix["include"][0].to_string();

    workspace
        .command()
        .env("GITHUB_TOKEN", "t0ken")
        .env("INPUT_SKIP-PUSH", "true")
        .env("INPUT_SKIP-STEP-SUMMARY", "true")
        .args(["--mode", "build", "--engine", engine.as_str(), "--config", row.as_str()])
        .assert()
        .success();

    let log = workspace.engine_log();
    assert_eq!(log.len(), 1);
    assert!(log[0].starts_with("build -f"));
    assert!(log[0].contains("--build-arg VERSION=0.0.0"));
    // Without a prefix the build output lands in the workspace root
    assert!(workspace.path().join("buildOutput.json").is_file());
    assert!(!workspace.summary().contains("## 🐳 Build"));
}

#[test]
fn test_build_by_name_from_full_config() {
    let workspace = TestWorkspace::new().unwrap();
    let engine = workspace.install_fake_engine().unwrap().to_string_lossy().to_string();
    workspace.write_file("containers.toml", PIPELINE_CONFIG).unwrap();

    workspace
        .command()
        .env("GITHUB_TOKEN", "t0ken")
        .env("SKIP_PUSH", "1")
        .args(["--mode", "build", "--engine", engine.as_str()])
        .args(["--config-file", "containers.toml", "--config-format", "toml"])
        .args(["--build-name", "linux-app-arm64"])
        .assert()
        .success();

    let output = workspace.json_output("build-output-json");
    assert_eq!(output["config"]["job"], "linux-app-arm64");

    workspace
        .command()
        .env("GITHUB_TOKEN", "t0ken")
        .args(["--mode", "build", "--engine", engine.as_str()])
        .args(["--config-file", "containers.toml", "--config-format", "toml"])
        .args(["--build-name", "linux-app-s390x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Available jobs: linux-app-amd64, linux-app-arm64"));
}

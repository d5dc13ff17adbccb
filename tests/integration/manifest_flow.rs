//! Matrix → build → manifest through the library with a recording engine.

use containerci_cli::build::{BuildContext, BuildOutput, run_build};
use containerci_cli::config::{Config, parse_config_str, resolve_config};
use containerci_cli::engine::EngineInvocation;
use containerci_cli::manifest_list::{CombineContext, combine};
use containerci_cli::matrix::build_matrix;
use containerci_cli::repository::RepositoryRegistry;
use containerci_cli::templating::TemplateVars;
use containerci_cli::test_utils::RecordingEngine;
use containerci_cli::test_utils::fixtures::ConfigFixture;

fn vars() -> TemplateVars {
    TemplateVars::with_env([
        ("GITHUB_RUN_ID", "42"),
        ("GITHUB_RUN_NUMBER", "7"),
        ("GITHUB_TOKEN", "t0ken"),
    ])
    .with_var("GIT_PROJECT_ROOT", "/src")
}

#[tokio::test]
async fn test_every_built_container_gets_manifests() {
    let fixture = ConfigFixture::multi_container();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let vars = vars();
    let config = resolve_config(&raw, &vars).unwrap();
    let matrix = build_matrix(&config).unwrap();

    let engine = RecordingEngine::new();
    let registry = RepositoryRegistry::with_builtin();
    let build_ctx = BuildContext {
        vars: &vars,
        engine: &engine,
        registry: &registry,
        skip_push: false,
    };
    let mut outputs: Vec<BuildOutput> = Vec::new();
    for row in &matrix.include {
        outputs.push(run_build(row, &build_ctx).await.unwrap());
    }
    assert_eq!(outputs[0].build_info.primary_tag, "ghcr.io/org/api:api-amd64-42-7");

    let manifest_engine = RecordingEngine::new();
    let combine_ctx = CombineContext {
        vars: &vars,
        engine: &manifest_engine,
        registry: &registry,
        skip_push: false,
    };
    let mut pushed = Vec::new();
    for (name, container) in config.iter() {
        let report = combine(name, container, &outputs, &combine_ctx).await.unwrap();
        pushed.extend(report.pushed);
    }

    assert_eq!(pushed, vec!["ghcr.io/org/api:api-42-7", "ghcr.io/org/worker:worker-42-7"]);
    let creates: Vec<_> = manifest_engine
        .invocations()
        .into_iter()
        .filter_map(|invocation| match invocation {
            EngineInvocation::ManifestCreate { manifest, images } => Some((manifest, images)),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[1].1, vec!["ghcr.io/org/worker:worker-amd64-42-7".to_string()]);
}

#[tokio::test]
async fn test_container_without_outputs_fails() {
    let fixture = ConfigFixture::multi_container();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let vars = vars();
    let config = resolve_config(&raw, &vars).unwrap();

    let engine = RecordingEngine::new();
    let registry = RepositoryRegistry::with_builtin();
    let ctx = CombineContext {
        vars: &vars,
        engine: &engine,
        registry: &registry,
        skip_push: false,
    };

    let api = config.get("api").unwrap();
    let err = combine("api", api, &Vec::<BuildOutput>::new(), &ctx).await.unwrap_err();
    assert_eq!(err.to_string(), "No primary tags found for container api");
}

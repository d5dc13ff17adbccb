//! Config parsing, validation and rendering through the public API.

use containerci_cli::config::{
    Config, ConfigFormat, parse_config_str, read_config_source, resolve_config,
};
use containerci_cli::matrix::{build_linux_matrix, build_matrix, build_windows_matrix};
use containerci_cli::templating::TemplateVars;
use containerci_cli::test_utils::fixtures::ConfigFixture;
use tempfile::tempdir;

fn vars() -> TemplateVars {
    TemplateVars::with_env([("GITHUB_RUN_ID", "42"), ("GITHUB_RUN_NUMBER", "7")])
        .with_var("GIT_PROJECT_ROOT", "/src")
}

#[test]
fn test_basic_fixture_resolves_with_cascade_and_fallbacks() {
    let fixture = ConfigFixture::basic();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let config = resolve_config(&raw, &vars()).unwrap();

    let app = config.get("app").unwrap();
    let amd64 = &app.linux_platforms["amd64"];
    assert_eq!(amd64.containerfile_path, "/src/Containerfile");
    assert_eq!(amd64.context_path, "/src");
    assert_eq!(amd64.arch.as_deref(), Some("amd64"));
    assert_eq!(amd64.build_args["VERSION"].default.as_deref(), Some("1.0.0"));
    assert_eq!(amd64.repositories["ghcr"].registry, "ghcr.io");
    // Tag templates are rendered per job, not at resolve time
    assert_eq!(
        amd64.platform_tag_templates,
        vec!["{{ CONTAINER_NAME }}-{{ ARCH }}-{{ GITHUB_RUN_ID }}"]
    );

    let windows = &app.windows_platforms["ltsc2022"];
    assert_eq!(windows.containerfile_path, "/src/Containerfile.windows");
    assert_eq!(windows.arch.as_deref(), Some("amd64"));
    assert_eq!(windows.platform_slug, None);

    assert_eq!(app.manifest_tag_templates, vec!["{{ CONTAINER_NAME }}-{{ GITHUB_RUN_ID }}"]);
}

#[test]
fn test_formats_resolve_to_the_same_platform() {
    let mut resolved = Vec::new();
    for fixture in [ConfigFixture::yaml(), ConfigFixture::json()] {
        let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
        let config = resolve_config(&raw, &vars()).unwrap();
        let platform = config.get("app").unwrap().linux_platforms["amd64"].clone();
        resolved.push((platform.platform_slug, platform.arch, platform.containerfile_path));
    }
    assert_eq!(resolved[0], resolved[1]);
}

#[test]
fn test_parse_config_from_file() {
    let dir = tempdir().unwrap();
    let path = ConfigFixture::multi_container().write_to(dir.path(), "containers.toml").unwrap();

    let content = read_config_source(None, Some(&path)).unwrap();
    let raw: Config = parse_config_str(&content, ConfigFormat::Toml).unwrap();
    let config = resolve_config(&raw, &vars()).unwrap();

    let names: Vec<_> = config.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["api", "worker"]);
    let worker = &config.get("worker").unwrap().linux_platforms["amd64"];
    assert_eq!(worker.target.as_deref(), Some("runtime"));
}

#[test]
fn test_matrices_split_by_family() {
    let fixture = ConfigFixture::basic();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let config = resolve_config(&raw, &vars()).unwrap();

    let all = build_matrix(&config).unwrap();
    assert_eq!(all.job, vec!["linux-app-amd64", "linux-app-arm64", "windows-app-ltsc2022"]);
    assert_eq!(build_linux_matrix(&config).unwrap().include.len(), 2);
    assert_eq!(build_windows_matrix(&config).unwrap().job, vec!["windows-app-ltsc2022"]);

    let multi = ConfigFixture::multi_container();
    let raw: Config = parse_config_str(&multi.content, multi.format).unwrap();
    let config = resolve_config(&raw, &vars()).unwrap();
    assert!(build_windows_matrix(&config).is_none());
}

#[test]
fn test_unknown_repository_is_rejected() {
    let fixture = ConfigFixture::unknown_repository();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let err = resolve_config(&raw, &vars()).unwrap_err();
    assert!(format!("{err:#}").contains("Repository dockerhub not found"));
}

#[test]
fn test_finalized_config_json_shape() {
    let fixture = ConfigFixture::basic();
    let raw: Config = parse_config_str(&fixture.content, fixture.format).unwrap();
    let config = resolve_config(&raw, &vars()).unwrap();

    let json = serde_json::to_value(&config).unwrap();
    let platform = &json["app"]["linuxPlatforms"]["arm64"];
    assert_eq!(platform["platform_slug"], "linux/arm64");
    assert_eq!(platform["containerfilePath"], "/src/Containerfile");
    assert_eq!(
        platform["buildArgs"]["VERSION"]["orderPrecedence"],
        serde_json::json!(["cmd", "env_var", "default"])
    );
}

//! `combine-build-outputs`: gather the `buildOutput.json` of every build job.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{ModeInputs, ModeReturn, RunContext};
use crate::build::BuildOutput;
use crate::ci::{SummaryTable, code};
use crate::constants::BUILD_OUTPUT_FILE_NAME;
use crate::core::ContainerCiError;

pub async fn combine_build_outputs_mode(
    ctx: &RunContext,
    inputs: &ModeInputs,
) -> Result<ModeReturn> {
    info!("Combining build outputs...");
    let Some(prefix) = inputs.prefix() else {
        return Err(ContainerCiError::InvalidInput {
            name: "build-output-artifact-name-prefix".to_string(),
            reason: "is required".to_string(),
        }
        .into());
    };

    let combined = collect_build_outputs(&ctx.workspace, prefix)?;
    info!("Found {} build outputs", combined.len());

    ctx.summary.write(&summary(&combined))?;

    Ok(ModeReturn {
        build_output: Some(serde_json::to_value(&combined)?),
        ..Default::default()
    })
}

/// Read `<workspace>/<prefix>*/buildOutput.json`, keyed by the directory name
/// minus the prefix, in directory name order.
///
/// Matching directories without a build output file are skipped.
pub fn collect_build_outputs(
    workspace: &Path,
    prefix: &str,
) -> Result<IndexMap<String, BuildOutput>> {
    let mut combined = IndexMap::new();

    let entries = WalkDir::new(workspace).min_depth(1).max_depth(1).sort_by_file_name();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read workspace: {}", workspace.display()))?;
        let name = entry.file_name().to_string_lossy();
        let Some(job) = name.strip_prefix(prefix) else {
            continue;
        };

        let path = entry.path().join(BUILD_OUTPUT_FILE_NAME);
        if !path.is_file() {
            warn!("No {} in {}, skipping", BUILD_OUTPUT_FILE_NAME, entry.path().display());
            continue;
        }
        debug!("Reading {}", path.display());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read build output: {}", path.display()))?;
        let output: BuildOutput = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build output: {}", path.display()))?;
        combined.insert(job.to_string(), output);
    }
    Ok(combined)
}

fn summary(combined: &IndexMap<String, BuildOutput>) -> String {
    let mut by_container: IndexMap<&str, Vec<&BuildOutput>> = IndexMap::new();
    for output in combined.values() {
        by_container.entry(output.container_name()).or_default().push(output);
    }

    let mut out = String::from(
        "<details>\n<summary>🐳 Combined Build Outputs Summary (click to expand for details)</summary>\n\n",
    );
    out.push_str("## 📋 Build Outputs\n\n");
    for (container, builds) in by_container {
        let mut table = SummaryTable::new(["Platform", "Primary Tag", "Total Tags", "Target"]);
        for build in builds {
            let info = &build.build_info;
            table.add_row([
                code(info.platform.as_deref().unwrap_or("default")),
                code(&info.primary_tag),
                info.total_tags.to_string(),
                info.target.as_deref().map_or_else(|| "-".to_string(), code),
            ]);
        }
        out.push_str(&format!("### 📦 {container}\n\n{}\n", table.render()));
    }
    out.push_str("\n</details>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{build_output, write_build_output};
    use tempfile::tempdir;

    #[test]
    fn test_collects_by_prefix() {
        let dir = tempdir().unwrap();
        let amd = build_output("app", "linux/amd64", "ghcr.io/org/app:amd64");
        let arm = build_output("app", "linux/arm64", "ghcr.io/org/app:arm64");
        write_build_output(dir.path(), "build-output-linux-app-arm64", &arm).unwrap();
        write_build_output(dir.path(), "build-output-linux-app-amd64", &amd).unwrap();
        write_build_output(dir.path(), "unrelated", &amd).unwrap();
        std::fs::create_dir(dir.path().join("build-output-empty")).unwrap();

        let combined = collect_build_outputs(dir.path(), "build-output-").unwrap();

        let keys: Vec<_> = combined.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["linux-app-amd64", "linux-app-arm64"]);
        assert_eq!(combined["linux-app-arm64"], arm);
    }

    #[test]
    fn test_summary_groups_by_container() {
        let mut combined = IndexMap::new();
        combined.insert("a".to_string(), build_output("app", "linux/amd64", "app:amd64"));
        combined.insert("b".to_string(), build_output("worker", "linux/amd64", "worker:amd64"));

        let markdown = summary(&combined);
        assert!(markdown.contains("### 📦 app"));
        assert!(markdown.contains("### 📦 worker"));
        assert!(markdown.contains("| `linux/amd64` | `app:amd64` | 1 | - |"));
    }
}

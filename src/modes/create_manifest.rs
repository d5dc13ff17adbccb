//! `create-manifest`: assemble multi-platform manifests for every container.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{ModeInputs, ModeReturn, RunContext};
use crate::build::BuildOutput;
use crate::core::ContainerCiError;
use crate::manifest_list::{CombineContext, combine};

pub async fn create_manifest_mode(ctx: &RunContext, inputs: &ModeInputs) -> Result<ModeReturn> {
    info!("Starting create-manifest mode");
    let config = ctx.load_config(inputs).await?;

    let raw = inputs.build_outputs.as_deref().unwrap_or_default();
    let outputs = parse_build_outputs(raw)?;
    info!("Found {} build outputs", outputs.len());

    let vars = ctx.vars_with_project_root().await?;
    let combine_ctx = CombineContext {
        vars: &vars,
        engine: ctx.engine.as_ref(),
        registry: &ctx.registry,
        skip_push: ctx.skip_push,
    };

    let mut summary = String::from("## 🐳 Container Manifest Summary\n\n");
    for (name, container) in config.iter() {
        info!("Processing container: {}", name);
        let report = combine(name, container, &outputs, &combine_ctx)
            .await
            .with_context(|| format!("Failed to create manifests for container {name}"))?;
        summary.push_str(&report.to_markdown());
    }
    ctx.summary.write(&summary)?;

    info!("Create manifest mode completed successfully");
    Ok(ModeReturn::default())
}

/// Parse the `build-outputs` input: the map emitted by `combine-build-outputs`, or
/// a plain array of build outputs.
pub fn parse_build_outputs(raw: &str) -> Result<Vec<BuildOutput>> {
    if raw.trim().is_empty() {
        return Err(ContainerCiError::InvalidInput {
            name: "build-outputs".to_string(),
            reason: "is required".to_string(),
        }
        .into());
    }

    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        debug!("Build outputs input length: {}", raw.len());
        ContainerCiError::InvalidInput {
            name: "build-outputs".to_string(),
            reason: format!("not valid JSON: {e}"),
        }
    })?;

    let items = match value {
        serde_json::Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        serde_json::Value::Array(items) => items,
        _ => {
            return Err(ContainerCiError::InvalidInput {
                name: "build-outputs".to_string(),
                reason: "must be a JSON object or array".to_string(),
            }
            .into());
        }
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).context("Failed to parse build output"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::build_output;
    use indexmap::IndexMap;

    #[test]
    fn test_accepts_map_and_array() {
        let a = build_output("app", "linux/amd64", "a");
        let b = build_output("app", "linux/arm64", "b");

        let mut map = IndexMap::new();
        map.insert("linux-app-amd64", &a);
        map.insert("linux-app-arm64", &b);
        let from_map = parse_build_outputs(&serde_json::to_string(&map).unwrap()).unwrap();
        assert_eq!(from_map, vec![a.clone(), b.clone()]);

        let from_array = parse_build_outputs(&serde_json::to_string(&[&b, &a]).unwrap()).unwrap();
        assert_eq!(from_array, vec![b, a]);
    }

    #[test]
    fn test_rejects_scalars_and_garbage() {
        assert!(parse_build_outputs("").unwrap_err().to_string().contains("build-outputs"));
        assert!(parse_build_outputs("42").unwrap_err().to_string().contains("object or array"));
        let err = parse_build_outputs("{not json").unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}

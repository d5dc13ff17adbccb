//! `generate-matrix`: resolve the config and emit the job matrices.

use anyhow::Result;
use tracing::{debug, info};

use super::{ModeInputs, ModeReturn, RunContext};
use crate::ci::{SummaryTable, code};
use crate::config::FinalizedConfig;
use crate::matrix::{build_linux_matrix, build_matrix, build_windows_matrix};

pub async fn generate_matrix_mode(ctx: &RunContext, inputs: &ModeInputs) -> Result<ModeReturn> {
    let config = ctx.load_config(inputs).await?;
    debug!("Finalized container config: {}", serde_json::to_string_pretty(&config)?);

    let job_matrix = build_matrix(&config);
    let linux_matrix = build_linux_matrix(&config);
    let windows_matrix = build_windows_matrix(&config);
    info!(
        "Generated {} jobs ({} linux, {} windows)",
        job_matrix.as_ref().map_or(0, |m| m.include.len()),
        linux_matrix.as_ref().map_or(0, |m| m.include.len()),
        windows_matrix.as_ref().map_or(0, |m| m.include.len())
    );

    ctx.summary.write(&summary(&config))?;

    Ok(ModeReturn {
        finalized_container_config: Some(config),
        job_matrix,
        linux_matrix,
        windows_matrix,
        ..Default::default()
    })
}

fn summary(config: &FinalizedConfig) -> String {
    let mut table = SummaryTable::new(["Container", "OS", "Platform", "Arch"]);
    for (name, container) in config.iter() {
        let families =
            [("linux", &container.linux_platforms), ("windows", &container.windows_platforms)];
        for (os, platforms) in families {
            for platform in platforms.values() {
                table.add_row([
                    code(name),
                    os.to_string(),
                    platform.platform_slug.as_deref().map_or_else(|| "-".to_string(), code),
                    platform.arch.as_deref().map_or_else(|| "-".to_string(), code),
                ]);
            }
        }
    }
    format!("## 🧮 Build Matrix\n\n{}", table.render())
}

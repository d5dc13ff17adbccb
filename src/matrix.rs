//! Build matrix expansion.
//!
//! A matrix is the job list handed to the CI platform's fan-out: one row per
//! platform of every container, shaped as
//!
//! ```json
//! {
//!   "job": ["linux-app-amd64", "linux-app-arm64"],
//!   "include": [
//!     { "job": "linux-app-amd64", "containerName": "app", "os": "linux", "platform_slug": "linux/amd64", ... }
//!   ]
//! }
//! ```
//!
//! Job keys are `{os}-{containerName}-{platformKey}`. They are unique because
//! container names and platform keys are mapping keys. Containers keep their
//! declaration order and a container's Linux platforms precede its Windows
//! platforms.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{FinalizedConfig, FinalizedPlatformConfig, PlatformOs};

/// One matrix row: a finalized platform plus its job identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInclude {
    pub job: String,
    pub container_name: String,
    pub os: PlatformOs,
    #[serde(flatten)]
    pub platform: FinalizedPlatformConfig,
}

/// Matrix descriptor consumed by the CI platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub job: Vec<String>,
    pub include: Vec<JobInclude>,
}

impl Matrix {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Find a row by job key.
    pub fn find(&self, job: &str) -> Option<&JobInclude> {
        self.include.iter().find(|row| row.job == job)
    }

    fn push(&mut self, row: JobInclude) {
        self.job.push(row.job.clone());
        self.include.push(row);
    }
}

/// Job key for a platform of a container.
pub fn job_key(os: PlatformOs, container_name: &str, platform_key: &str) -> String {
    format!("{os}-{container_name}-{platform_key}")
}

/// Expand every platform of every container; `None` when there is nothing to build.
pub fn build_matrix(config: &FinalizedConfig) -> Option<Matrix> {
    expand(config, &[PlatformOs::Linux, PlatformOs::Windows])
}

/// Expand only Linux platforms.
pub fn build_linux_matrix(config: &FinalizedConfig) -> Option<Matrix> {
    expand(config, &[PlatformOs::Linux])
}

/// Expand only Windows platforms.
pub fn build_windows_matrix(config: &FinalizedConfig) -> Option<Matrix> {
    expand(config, &[PlatformOs::Windows])
}

fn expand(config: &FinalizedConfig, families: &[PlatformOs]) -> Option<Matrix> {
    let mut matrix = Matrix::default();

    for (container_name, container) in config.iter() {
        debug!("Building matrix for container: {}", container_name);

        for &os in families {
            let platforms = match os {
                PlatformOs::Linux => &container.linux_platforms,
                PlatformOs::Windows => &container.windows_platforms,
            };

            for (platform_key, platform) in platforms {
                let job = job_key(os, container_name, platform_key);
                debug!(
                    "Building matrix for {} platform: {} for container: {} [Job Key: {}]",
                    os, platform_key, container_name, job
                );
                matrix.push(JobInclude {
                    job,
                    container_name: container_name.clone(),
                    os,
                    platform: platform.clone(),
                });
            }
        }
    }

    if matrix.is_empty() {
        debug!("Matrix has no jobs");
        None
    } else {
        Some(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FinalizedContainerConfig;
    use std::collections::HashSet;

    fn platform(slug: &str) -> FinalizedPlatformConfig {
        FinalizedPlatformConfig {
            platform_slug: Some(slug.to_string()),
            ..Default::default()
        }
    }

    fn config() -> FinalizedConfig {
        let mut app = FinalizedContainerConfig::default();
        app.windows_platforms.insert("ltsc2022".into(), platform("windows/amd64"));
        app.linux_platforms.insert("amd64".into(), platform("linux/amd64"));
        app.linux_platforms.insert("arm64".into(), platform("linux/arm64"));

        let mut worker = FinalizedContainerConfig::default();
        worker.linux_platforms.insert("amd64".into(), platform("linux/amd64"));

        let mut config = FinalizedConfig::default();
        config.containers.insert("app".into(), app);
        config.containers.insert("worker".into(), worker);
        config
    }

    #[test]
    fn test_job_order_and_keys() {
        let matrix = build_matrix(&config()).unwrap();
        assert_eq!(
            matrix.job,
            vec!["linux-app-amd64", "linux-app-arm64", "windows-app-ltsc2022", "linux-worker-amd64"]
        );
        assert_eq!(matrix.include.len(), matrix.job.len());
    }

    #[test]
    fn test_job_keys_are_unique() {
        let matrix = build_matrix(&config()).unwrap();
        let unique: HashSet<_> = matrix.job.iter().collect();
        assert_eq!(unique.len(), matrix.job.len());
    }

    #[test]
    fn test_rows_carry_container_and_platform() {
        let matrix = build_matrix(&config()).unwrap();
        let row = matrix.find("linux-app-arm64").unwrap();
        assert_eq!(row.container_name, "app");
        assert_eq!(row.os, PlatformOs::Linux);
        assert_eq!(row.platform.platform_slug.as_deref(), Some("linux/arm64"));
    }

    #[test]
    fn test_split_matrices() {
        let config = config();
        let linux = build_linux_matrix(&config).unwrap();
        assert_eq!(linux.job.len(), 3);
        let windows = build_windows_matrix(&config).unwrap();
        assert_eq!(windows.job, vec!["windows-app-ltsc2022"]);
    }

    #[test]
    fn test_empty_matrix_is_none() {
        assert!(build_matrix(&FinalizedConfig::default()).is_none());

        let mut config = FinalizedConfig::default();
        let mut app = FinalizedContainerConfig::default();
        app.linux_platforms.insert("amd64".into(), platform("linux/amd64"));
        config.containers.insert("app".into(), app);
        assert!(build_windows_matrix(&config).is_none());
    }

    #[test]
    fn test_row_serializes_flat() {
        let matrix = build_matrix(&config()).unwrap();
        let json = serde_json::to_value(&matrix.include[0]).unwrap();
        assert_eq!(json["job"], "linux-app-amd64");
        assert_eq!(json["containerName"], "app");
        assert_eq!(json["os"], "linux");
        assert_eq!(json["platform_slug"], "linux/amd64");

        let back: JobInclude = serde_json::from_value(json).unwrap();
        assert_eq!(back, matrix.include[0]);
    }
}

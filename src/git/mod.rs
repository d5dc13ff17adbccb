//! Source root discovery.
//!
//! The source root becomes the `GIT_PROJECT_ROOT` template variable, which the
//! built-in containerfile and context fallbacks point into. In CI the workspace
//! directory is authoritative; elsewhere the root of the enclosing git work tree
//! is used.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{GIT_COMMAND_TIMEOUT, GITHUB_WORKSPACE_ENV};
use crate::core::ContainerCiError;
use crate::engine::ProcessCommand;
use crate::templating::TemplateVars;

/// Find the source root: `GITHUB_WORKSPACE` if set, else `git rev-parse --show-toplevel`
/// run from `cwd`.
pub async fn find_project_root(vars: &TemplateVars, cwd: &Path) -> Result<PathBuf> {
    if let Some(workspace) = vars.env_var(GITHUB_WORKSPACE_ENV) {
        debug!("Using {} as project root: {}", GITHUB_WORKSPACE_ENV, workspace);
        return Ok(PathBuf::from(workspace));
    }

    let git = which::which("git").map_err(|_| ContainerCiError::ProjectRootNotFound {
        reason: format!("{GITHUB_WORKSPACE_ENV} is not set and git is not installed"),
    })?;
    debug!("Discovering project root with {}", git.display());

    let output = ProcessCommand::new(git.to_string_lossy())
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .with_timeout(Some(GIT_COMMAND_TIMEOUT))
        .with_context("project root")
        .output()
        .await?;

    let root = output.stdout.trim();
    if !output.success() || root.is_empty() {
        return Err(ContainerCiError::ProjectRootNotFound {
            reason: format!("{} is not inside a git work tree", cwd.display()),
        }
        .into());
    }
    Ok(PathBuf::from(root))
}

//! Build argument resolution.
//!
//! Each argument walks its `orderPrecedence` and takes the first source that yields
//! a non-empty value:
//!
//! - `default`: the literal value
//! - `cmd`: trimmed stdout of the command run through the platform shell. A
//!   failing command aborts resolution; it does not fall through.
//! - `env_var`: the variable from the captured environment; unset or empty counts
//!   as unavailable
//!
//! An argument no source can satisfy is left out with a warning.

use anyhow::Result;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::{BuildArgPrecedence, FinalizedBuildArgConfig};
use crate::core::ContainerCiError;
use crate::engine::ProcessCommand;
use crate::templating::TemplateVars;

/// Resolve every build argument to its value, keeping declaration order.
pub async fn resolve_build_args(
    build_args: &IndexMap<String, FinalizedBuildArgConfig>,
    vars: &TemplateVars,
) -> Result<IndexMap<String, String>> {
    let mut resolved = IndexMap::with_capacity(build_args.len());

    for (name, arg) in build_args {
        match resolve_build_arg(name, arg, vars).await? {
            Some((value, source)) => {
                debug!("Build argument {} resolved from {}", name, source);
                resolved.insert(name.clone(), value);
            }
            None => warn!("Build argument {} has no value from any source, omitting it", name),
        }
    }

    Ok(resolved)
}

/// Resolve one build argument; `None` when no source yields a value.
pub async fn resolve_build_arg(
    name: &str,
    arg: &FinalizedBuildArgConfig,
    vars: &TemplateVars,
) -> Result<Option<(String, BuildArgPrecedence)>> {
    for &source in &arg.order_precedence {
        let value = match source {
            BuildArgPrecedence::Default => arg.default.clone().filter(|v| !v.is_empty()),
            BuildArgPrecedence::EnvVar => {
                arg.env_var.as_deref().and_then(|var| vars.env_var(var)).map(str::to_string)
            }
            BuildArgPrecedence::Cmd => match &arg.cmd {
                Some(command) => run_command(name, command).await?,
                None => None,
            },
        };

        if let Some(value) = value {
            return Ok(Some((value, source)));
        }
    }
    Ok(None)
}

async fn run_command(name: &str, command: &str) -> Result<Option<String>> {
    let output = ProcessCommand::shell(command).with_context(name).output().await?;

    if !output.success() {
        return Err(ContainerCiError::BuildArgCommand {
            name: name.to_string(),
            command: command.to_string(),
            stderr: output.failure_message(),
        }
        .into());
    }

    let value = output.stdout.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

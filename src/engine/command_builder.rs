//! Builder for external process execution.
//!
//! Every external program the tool runs goes through [`ProcessCommand`]: the
//! container engine, build argument shell commands and `git`. It gives them the same
//! logging (under the `engine` target), output capture and failure mapping.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::ContainerCiError;

/// Fluent builder for running an external program.
///
/// # Examples
///
/// ```rust,no_run
/// use containerci_cli::engine::ProcessCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let version = ProcessCommand::new("docker")
///     .args(["version", "--format", "{{.Server.Version}}"])
///     .execute_stdout()
///     .await?;
/// println!("engine {version}");
/// # Ok(())
/// # }
/// ```
///
/// Defaults: output captured, no timeout, current process directory, inherited
/// environment.
pub struct ProcessCommand {
    program: String,
    args: Vec<String>,
    /// Replacement for `args` in log and error output, when they carry secrets
    display_args: Option<Vec<String>>,
    current_dir: Option<PathBuf>,
    capture_output: bool,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            display_args: None,
            current_dir: None,
            capture_output: true,
            env_vars: Vec::new(),
            timeout_duration: None,
            context: None,
        }
    }

    /// Run `command` through the platform shell (`sh -c`, or `cmd /C` on Windows).
    pub fn shell(command: &str) -> Self {
        if cfg!(windows) {
            Self::new("cmd").args(["/C", command])
        } else {
            Self::new("sh").args(["-c", command])
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Arguments to show in logs and errors instead of the real ones.
    pub fn display_args(mut self, args: Vec<String>) -> Self {
        self.display_args = Some(args);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Let the process write straight to the parent's stdout and stderr.
    ///
    /// Used for long-running engine operations whose progress belongs in the CI
    /// log. Failures then carry no captured stderr.
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label included in log lines, e.g. the build argument or repository name.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The command line as it may be shown to users.
    pub fn command_line(&self) -> String {
        let args = self.display_args.as_ref().unwrap_or(&self.args);
        if args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, args.join(" "))
        }
    }

    /// Run the process without checking its exit status.
    ///
    /// Fails only when the process cannot be started or times out.
    pub async fn output(self) -> Result<CommandOutput> {
        let start = std::time::Instant::now();
        let command_line = self.command_line();

        match &self.context {
            Some(ctx) => {
                tracing::debug!(target: "engine", "({}) Executing command: {}", ctx, command_line)
            }
            None => tracing::debug!(target: "engine", "Executing command: {}", command_line),
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "engine", "Setting env var: {}", key);
            cmd.env(key, value);
        }
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result.with_context(|| format!("Failed to execute {command_line}"))?,
                Err(_) => {
                    tracing::warn!(
                        target: "engine",
                        "Command timed out after {} seconds: {}",
                        duration.as_secs(),
                        command_line
                    );
                    return Err(ContainerCiError::EngineCommand {
                        operation: self.operation(),
                        stderr: format!("timed out after {} seconds", duration.as_secs()),
                    }
                    .into());
                }
            },
            None => {
                output_future.await.with_context(|| format!("Failed to execute {command_line}"))?
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.trim().is_empty() {
            tracing::trace!(target: "engine", "{}", stdout.trim());
        }
        if !output.status.success() && !stderr.trim().is_empty() {
            tracing::debug!(target: "engine", "Error: {}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::debug!(
                target: "engine::perf",
                "{} took {:.2}s",
                self.operation(),
                elapsed.as_secs_f64()
            );
        }

        Ok(CommandOutput {
            status: output.status,
            stdout,
            stderr,
        })
    }

    /// Run the process and fail with [`ContainerCiError::EngineCommand`] on a
    /// non-zero exit.
    pub async fn execute(self) -> Result<CommandOutput> {
        let operation = self.operation();
        let output = self.output().await?;

        if !output.success() {
            tracing::debug!(
                target: "engine",
                "Command failed with exit code: {:?}",
                output.status.code()
            );
            return Err(ContainerCiError::EngineCommand {
                operation,
                stderr: output.failure_message(),
            }
            .into());
        }
        Ok(output)
    }

    /// Run the process and return its trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    /// Program plus the first argument, e.g. `docker push` or `docker manifest`.
    fn operation(&self) -> String {
        let args = self.display_args.as_ref().unwrap_or(&self.args);
        match args.first() {
            Some(first) => format!("{} {}", self.program, first),
            None => self.program.clone(),
        }
    }
}

/// Output of a finished process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Best available description of a failure: stderr, else stdout, else the status.
    pub fn failure_message(&self) -> String {
        [&self.stderr, &self.stdout]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map_or_else(|| self.status.to_string(), str::to_string)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_stdout_is_trimmed() {
        let out = ProcessCommand::shell("echo '  hello  '").execute_stdout().await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_failure_maps_to_engine_error_with_stderr() {
        let err = ProcessCommand::shell("echo boom >&2; exit 3").execute().await.unwrap_err();
        match err.downcast_ref::<ContainerCiError>() {
            Some(ContainerCiError::EngineCommand {
                operation,
                stderr,
            }) => {
                assert_eq!(operation, "sh -c");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_output_does_not_check_status() {
        let output = ProcessCommand::shell("exit 1").output().await.unwrap();
        assert!(!output.success());
        assert!(output.failure_message().contains('1'));
    }

    #[tokio::test]
    async fn test_env_and_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessCommand::shell("echo \"$GREETING\" && pwd")
            .env("GREETING", "hi")
            .current_dir(dir.path())
            .execute_stdout()
            .await
            .unwrap();
        assert!(out.starts_with("hi"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = ProcessCommand::shell("sleep 5")
            .with_timeout(Some(Duration::from_millis(100)))
            .execute()
            .await
            .unwrap_err();
        match err.downcast_ref::<ContainerCiError>() {
            Some(ContainerCiError::EngineCommand {
                stderr,
                ..
            }) => assert!(stderr.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display_args_hide_real_args() {
        let cmd = ProcessCommand::new("docker")
            .args(["login", "ghcr.io", "-p", "secret"])
            .display_args(vec!["login".into(), "ghcr.io".into(), "-p".into(), "***".into()]);
        assert_eq!(cmd.command_line(), "docker login ghcr.io -p ***");
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let err = ProcessCommand::new("containerci-no-such-program").output().await.unwrap_err();
        assert!(err.to_string().contains("Failed to execute"));
    }
}

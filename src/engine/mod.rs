//! Container engine invocations.
//!
//! The engine (`docker`, `podman`, ...) is an external program. This module decides
//! the exact command lines; [`ContainerEngine`] runs them. [`ProcessEngine`] is the
//! real implementation and tests substitute a recording one.
//!
//! | Invocation | Command line |
//! |---|---|
//! | login | `login <registry> -u <user> -p <password>` |
//! | build | `build -f <containerfile> -t <tag> [--build-arg K=V ...] [--target T] [--platform P] <context>` |
//! | tag | `tag <built> <other>` |
//! | push | `push <tag>` |
//! | manifest create | `manifest create <manifestTag> <primaryTag...>` |
//! | manifest push | `manifest push <manifestTag>` |

mod command_builder;

pub use command_builder::{CommandOutput, ProcessCommand};

use anyhow::Result;
use indexmap::IndexMap;
use std::future::Future;
use std::pin::Pin;

const REDACTED: &str = "***";

/// One engine operation with everything needed to build its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInvocation {
    Login {
        registry: String,
        username: Option<String>,
        password: Option<String>,
    },
    Build {
        containerfile: String,
        tag: String,
        build_args: IndexMap<String, String>,
        target: Option<String>,
        platform: Option<String>,
        context: String,
    },
    Tag {
        source: String,
        target: String,
    },
    Push {
        tag: String,
    },
    ManifestCreate {
        manifest: String,
        images: Vec<String>,
    },
    ManifestPush {
        manifest: String,
    },
}

impl EngineInvocation {
    /// Short operation name for logs and errors.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Login {
                ..
            } => "login",
            Self::Build {
                ..
            } => "build",
            Self::Tag {
                ..
            } => "tag",
            Self::Push {
                ..
            } => "push",
            Self::ManifestCreate {
                ..
            } => "manifest create",
            Self::ManifestPush {
                ..
            } => "manifest push",
        }
    }

    /// Arguments passed to the engine binary.
    pub fn args(&self) -> Vec<String> {
        self.render_args(false)
    }

    /// Arguments with the login password replaced by `***`.
    pub fn display_args(&self) -> Vec<String> {
        self.render_args(true)
    }

    /// Whether the engine's own output should stream into the CI log.
    pub const fn streams_output(&self) -> bool {
        !matches!(self, Self::Login { .. })
    }

    fn render_args(&self, redact: bool) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            Self::Login {
                registry,
                username,
                password,
            } => {
                args.extend(["login".to_string(), registry.clone()]);
                if let Some(username) = username {
                    args.extend(["-u".to_string(), username.clone()]);
                }
                if let Some(password) = password {
                    let shown = if redact { REDACTED.to_string() } else { password.clone() };
                    args.extend(["-p".to_string(), shown]);
                }
            }
            Self::Build {
                containerfile,
                tag,
                build_args,
                target,
                platform,
                context,
            } => {
                args.extend(["build", "-f"].map(String::from));
                args.push(containerfile.clone());
                args.extend(["-t".to_string(), tag.clone()]);
                for (name, value) in build_args {
                    args.extend(["--build-arg".to_string(), format!("{name}={value}")]);
                }
                if let Some(target) = target {
                    args.extend(["--target".to_string(), target.clone()]);
                }
                if let Some(platform) = platform {
                    args.extend(["--platform".to_string(), platform.clone()]);
                }
                args.push(context.clone());
            }
            Self::Tag {
                source,
                target,
            } => {
                args.extend(["tag".to_string(), source.clone(), target.clone()]);
            }
            Self::Push {
                tag,
            } => {
                args.extend(["push".to_string(), tag.clone()]);
            }
            Self::ManifestCreate {
                manifest,
                images,
            } => {
                args.extend(["manifest", "create"].map(String::from));
                args.push(manifest.clone());
                args.extend(images.iter().cloned());
            }
            Self::ManifestPush {
                manifest,
            } => {
                args.extend(["manifest", "push"].map(String::from));
                args.push(manifest.clone());
            }
        }
        args
    }
}

/// Runs engine invocations.
pub trait ContainerEngine: Send + Sync {
    /// Engine binary name, e.g. `docker`.
    fn name(&self) -> &str;

    /// Run one invocation; a non-zero exit is an error.
    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Engine backed by an external binary.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ContainerEngine for ProcessEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut command = ProcessCommand::new(&self.program)
                .args(invocation.args())
                .display_args(invocation.display_args())
                .with_context(invocation.operation());
            if invocation.streams_output() {
                command = command.inherit_stdio();
            }
            command.execute_success().await
        })
    }
}

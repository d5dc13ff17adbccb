//! Error handling for containerci
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`ContainerCiError`]) for precise handling in code
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions for the
//!    CI log, where the failure message is the only thing a pipeline author sees
//!
//! # Error Categories
//!
//! - **Schema**: [`ContainerCiError::ConfigSchema`], [`ContainerCiError::BuildArgConfig`],
//!   [`ContainerCiError::ConfigParse`]
//! - **References**: [`ContainerCiError::RepositoryNotFound`],
//!   [`ContainerCiError::UnknownRepositoryType`]
//! - **Empty resources**: [`ContainerCiError::NoPlatforms`],
//!   [`ContainerCiError::NoTagTemplates`], [`ContainerCiError::NoPrimaryTags`]
//! - **External commands**: [`ContainerCiError::EngineCommand`],
//!   [`ContainerCiError::BuildArgCommand`]
//!
//! Every one of them is fatal. Soft problems (missing credentials, misplaced manifest
//! templates, duplicate precedence entries) are `tracing::warn!` events instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use containerci_cli::core::{ContainerCiError, user_friendly_error};
//!
//! let error = ContainerCiError::RepositoryNotFound { name: "ghcr".to_string() };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for containerci operations.
#[derive(Error, Debug)]
pub enum ContainerCiError {
    /// A config value has the wrong shape or is missing a required field.
    ///
    /// `path` is the dotted location inside the config document, for example
    /// `containers.app.linuxPlatforms.amd64.selectedRepositories`.
    #[error("Invalid config at '{path}': {message}")]
    ConfigSchema {
        /// Dotted path of the offending field
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// A build argument definition is unusable.
    #[error("Invalid build argument config at '{path}': {message}")]
    BuildArgConfig {
        /// Dotted path of the build argument
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// The config document could not be parsed in the declared format.
    #[error("Failed to parse {format} config: {reason}")]
    ConfigParse {
        /// Declared format (toml, json, yaml)
        format: String,
        /// Parser message
        reason: String,
    },

    /// A platform selects a repository that is not defined globally.
    #[error("Repository {name} not found")]
    RepositoryNotFound {
        /// The selected repository name
        name: String,
    },

    /// No login strategy is registered for a repository `type`.
    #[error("Unknown repository type: {type_name}")]
    UnknownRepositoryType {
        /// The `type` value of the repository
        type_name: String,
    },

    /// A container ended up without any Linux or Windows platform.
    #[error("Container '{container}' must specify at least one platform (linux or windows)")]
    NoPlatforms {
        /// Container name
        container: String,
    },

    /// Both manifest and platform tag templates are empty for a container.
    #[error(
        "Container '{container}': manifestTagTemplates and platformTagTemplates cannot both be empty"
    )]
    NoTagTemplates {
        /// Container name
        container: String,
    },

    /// No build output references a container that should get a manifest.
    #[error("No primary tags found for container {container}")]
    NoPrimaryTags {
        /// Container name
        container: String,
    },

    /// A CI input is missing or malformed.
    #[error("Invalid input '{name}': {reason}")]
    InvalidInput {
        /// Input name as declared by the action (e.g. `config-format`)
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// A required environment variable is not set.
    #[error("Required environment variable {name} is not set")]
    MissingEnvironment {
        /// Variable name
        name: String,
    },

    /// The container engine exited with a failure status.
    #[error("Container engine operation failed: {operation}")]
    EngineCommand {
        /// The engine operation (login, build, push, manifest create, ...)
        operation: String,
        /// Captured error output
        stderr: String,
    },

    /// A build argument `cmd` failed.
    #[error("Command for build argument '{name}' failed: {command}")]
    BuildArgCommand {
        /// Build argument name
        name: String,
        /// The shell command that was executed
        command: String,
        /// Captured error output
        stderr: String,
    },

    /// Template rendering failed.
    #[error("Template error: {message}")]
    Template {
        /// Formatted tera error
        message: String,
    },

    /// Source-control root could not be discovered.
    #[error("Could not determine the project root: {reason}")]
    ProjectRootNotFound {
        /// Why discovery failed
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for ContainerCiError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigSchema {
                path,
                message,
            } => Self::ConfigSchema {
                path: path.clone(),
                message: message.clone(),
            },
            Self::BuildArgConfig {
                path,
                message,
            } => Self::BuildArgConfig {
                path: path.clone(),
                message: message.clone(),
            },
            Self::ConfigParse {
                format,
                reason,
            } => Self::ConfigParse {
                format: format.clone(),
                reason: reason.clone(),
            },
            Self::RepositoryNotFound {
                name,
            } => Self::RepositoryNotFound {
                name: name.clone(),
            },
            Self::UnknownRepositoryType {
                type_name,
            } => Self::UnknownRepositoryType {
                type_name: type_name.clone(),
            },
            Self::NoPlatforms {
                container,
            } => Self::NoPlatforms {
                container: container.clone(),
            },
            Self::NoTagTemplates {
                container,
            } => Self::NoTagTemplates {
                container: container.clone(),
            },
            Self::NoPrimaryTags {
                container,
            } => Self::NoPrimaryTags {
                container: container.clone(),
            },
            Self::InvalidInput {
                name,
                reason,
            } => Self::InvalidInput {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::MissingEnvironment {
                name,
            } => Self::MissingEnvironment {
                name: name.clone(),
            },
            Self::EngineCommand {
                operation,
                stderr,
            } => Self::EngineCommand {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::BuildArgCommand {
                name,
                command,
                stderr,
            } => Self::BuildArgCommand {
                name: name.clone(),
                command: command.clone(),
                stderr: stderr.clone(),
            },
            Self::Template {
                message,
            } => Self::Template {
                message: message.clone(),
            },
            Self::ProjectRootNotFound {
                reason,
            } => Self::ProjectRootNotFound {
                reason: reason.clone(),
            },
            // io::Error and serde_json::Error are not Clone; keep the message
            Self::Io(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Json(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a suggestion and details for the CI log.
///
/// ```rust,no_run
/// use containerci_cli::core::{ContainerCiError, ErrorContext};
///
/// let context = ErrorContext::new(ContainerCiError::NoPlatforms { container: "app".into() })
///     .with_suggestion("Add a [containers.app.linuxPlatforms.<key>] table")
///     .with_details("Every container is built for at least one platform");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ContainerCiError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: ContainerCiError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// [`ContainerCiError`] values get tailored suggestions; anything else is reported
/// with its full cause chain, since the chain usually holds the engine or parser
/// message that explains the failure.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ci_error) = error.downcast_ref::<ContainerCiError>() {
        let mut context = create_error_context(ci_error.clone());
        // Context layers added with .context() show up as the remaining chain entries
        let own_message = ci_error.to_string();
        let chain: Vec<String> = error
            .chain()
            .map(std::string::ToString::to_string)
            .filter(|message| *message != own_message)
            .collect();
        if context.details.is_none() && !chain.is_empty() {
            context.details = Some(chain.join(": "));
        }
        return context;
    }

    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    // Walk the chain: the interesting error is often wrapped in .context() layers
    for cause in error.chain().skip(1) {
        if let Some(ci_error) = cause.downcast_ref::<ContainerCiError>() {
            return create_error_context(ci_error.clone()).with_details(error.to_string());
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(ContainerCiError::Other {
        message,
    })
}

fn create_error_context(error: ContainerCiError) -> ErrorContext {
    match &error {
        ContainerCiError::ConfigSchema {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the type of the field at that path; paths are dotted from the document root",
        ),
        ContainerCiError::BuildArgConfig {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Set at least one of 'default', 'cmd' or 'env_var', and only use 'cmd', 'env_var' and 'default' in orderPrecedence",
        ),
        ContainerCiError::ConfigParse {
            format,
            ..
        } => {
            let format = format.clone();
            ErrorContext::new(error).with_suggestion(format!(
                "Check that the config is valid {format} and that 'config-format' matches it"
            ))
        }
        ContainerCiError::RepositoryNotFound {
            name,
        } => {
            let name = name.clone();
            ErrorContext::new(error).with_suggestion(format!(
                "Define [repositories.{name}] in the config or remove it from selectedRepositories"
            ))
        }
        ContainerCiError::UnknownRepositoryType {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use type = \"standard\" for username/password registries"),
        ContainerCiError::NoPlatforms {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Add at least one entry under linuxPlatforms or windowsPlatforms"),
        ContainerCiError::NoTagTemplates {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Set platformTagTemplates or manifestTagTemplates (or leave them unset to use the defaults)",
        ),
        ContainerCiError::NoPrimaryTags {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Make sure every build job uploaded its buildOutput.json and that build-outputs was passed through",
        ),
        ContainerCiError::MissingEnvironment {
            name,
        } => {
            let name = name.clone();
            ErrorContext::new(error)
                .with_suggestion(format!("Expose {name} to the step via its env block"))
        }
        ContainerCiError::EngineCommand {
            stderr,
            ..
        }
        | ContainerCiError::BuildArgCommand {
            stderr,
            ..
        } => {
            let stderr = stderr.trim().to_string();
            let context = ErrorContext::new(error);
            if stderr.is_empty() {
                context
            } else {
                context.with_details(stderr)
            }
        }
        ContainerCiError::Template {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Placeholders use {{ NAME }}; every name must be an environment variable or a built-in value such as GIT_PROJECT_ROOT or CONTAINER_NAME",
        ),
        ContainerCiError::ProjectRootNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run inside a git checkout or set GITHUB_WORKSPACE"),
        _ => ErrorContext::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_message() {
        let error = ContainerCiError::RepositoryNotFound {
            name: "ghcr".to_string(),
        };
        assert_eq!(error.to_string(), "Repository ghcr not found");
    }

    #[test]
    fn test_user_friendly_error_adds_suggestion() {
        let error = anyhow::Error::from(ContainerCiError::NoPlatforms {
            container: "app".to_string(),
        });
        let context = user_friendly_error(error);
        assert!(context.suggestion.is_some());
        assert!(context.to_string().contains("at least one platform"));
    }

    #[test]
    fn test_user_friendly_error_finds_wrapped_error() {
        let error = anyhow::Error::from(ContainerCiError::RepositoryNotFound {
            name: "quay".to_string(),
        })
        .context("Failed to validate container 'app'");
        let context = user_friendly_error(error);
        assert!(matches!(context.error, ContainerCiError::RepositoryNotFound { .. }));
        assert!(context.details.unwrap().contains("Failed to validate container 'app'"));
    }

    #[test]
    fn test_engine_error_details_carry_stderr() {
        let error = anyhow::Error::from(ContainerCiError::EngineCommand {
            operation: "push".to_string(),
            stderr: "denied: requested access to the resource is denied\n".to_string(),
        });
        let context = user_friendly_error(error);
        assert_eq!(
            context.details.as_deref(),
            Some("denied: requested access to the resource is denied")
        );
    }

    #[test]
    fn test_generic_error_includes_chain() {
        let error = anyhow::anyhow!("inner").context("outer");
        let context = user_friendly_error(error);
        let text = context.to_string();
        assert!(text.contains("outer"));
        assert!(text.contains("Caused by"));
        assert!(text.contains("inner"));
    }
}

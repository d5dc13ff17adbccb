//! Config document parsing.
//!
//! A config arrives either inline (the `config` input) or as a path (the
//! `config-file` input) and is parsed according to `config-format`. Inline content
//! takes precedence when both are given.
//!
//! Values of the wrong type are reported against their dotted path:
//! ```text
//! error: Invalid config at 'containers.app.linuxPlatforms.amd64.target': invalid type: integer `5`, expected a string
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;

use crate::core::ContainerCiError;

/// Serialization format of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Toml => "toml",
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}

/// Parse a config document from a string.
///
/// Works for any `DeserializeOwned` type, so the same entry point reads raw configs
/// and pre-resolved matrix rows.
///
/// # Examples
///
/// ```rust
/// use containerci_cli::config::{Config, ConfigFormat, parse_config_str};
///
/// # fn example() -> anyhow::Result<()> {
/// let config: Config = parse_config_str(
///     r#"{"containers": {"app": {"linuxPlatforms": {"amd64": {"platform_slug": "linux/amd64"}}}}}"#,
///     ConfigFormat::Json,
/// )?;
/// assert!(config.containers.contains_key("app"));
/// # Ok(())
/// # }
/// ```
pub fn parse_config_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T> {
    tracing::debug!("Parsing {} config ({} bytes)", format, content.len());

    match format {
        ConfigFormat::Toml => {
            // Syntax first, so that type errors are reported against the key path
            let table: toml::Table =
                toml::from_str(content).map_err(|e| parse_error(format, &e))?;
            serde_path_to_error::deserialize(toml::Value::Table(table))
                .map_err(|e| schema_error(format, &e))
        }
        ConfigFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(content);
            let value = serde_path_to_error::deserialize(&mut deserializer)
                .map_err(|e| schema_error(format, &e))?;
            deserializer.end().map_err(|e| parse_error(format, &e))?;
            Ok(value)
        }
        ConfigFormat::Yaml => {
            serde_path_to_error::deserialize(serde_yaml::Deserializer::from_str(content))
                .map_err(|e| schema_error(format, &e))
        }
    }
}

fn parse_error(format: ConfigFormat, error: &dyn fmt::Display) -> anyhow::Error {
    ContainerCiError::ConfigParse {
        format: format.to_string(),
        reason: error.to_string().trim().to_string(),
    }
    .into()
}

/// Errors with a location inside the document name the field; errors at the root
/// (syntax errors, empty documents) stay parse errors.
fn schema_error<E: fmt::Display>(
    format: ConfigFormat,
    error: &serde_path_to_error::Error<E>,
) -> anyhow::Error {
    let path = error.path().to_string();
    if path == "." {
        return parse_error(format, error.inner());
    }
    ContainerCiError::ConfigSchema {
        path,
        message: error.inner().to_string().trim().to_string(),
    }
    .into()
}

/// Read the config document text from the inline input or the file input.
///
/// Empty values count as absent. Having neither, or naming a file that does not
/// exist, is an [`ContainerCiError::InvalidInput`].
pub fn read_config_source(inline: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(content) = inline.filter(|c| !c.trim().is_empty()) {
        tracing::debug!("Using inline config");
        return Ok(content.to_string());
    }

    let Some(path) = file.filter(|p| !p.as_os_str().is_empty()) else {
        return Err(ContainerCiError::InvalidInput {
            name: "config".to_string(),
            reason: "either `config` or `config-file` must be provided".to_string(),
        }
        .into());
    };

    if !path.exists() {
        return Err(ContainerCiError::InvalidInput {
            name: "config-file".to_string(),
            reason: format!("Config file does not exist: {}", path.display()),
        }
        .into());
    }

    tracing::info!("Reading config file: {}", path.display());
    read_config_file(path)
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))
}

//! Build configuration: document types, parsing, validation and resolution.
//!
//! A config document has three inheritance levels:
//!
//! ```toml
//! [default]                               # global defaults
//! containerfilePath = "${GIT_PROJECT_ROOT}/Containerfile"
//! selectedRepositories = ["ghcr"]
//!
//! [repositories.ghcr]
//! type = "standard"
//! registry = "ghcr.io"
//! repository = "org/app"
//! username = "{{ env.GITHUB_ACTOR }}"
//! password = "{{ env.GITHUB_TOKEN }}"
//!
//! [containers.app.default]                # container defaults
//! selectedBuildArgs = ["VERSION"]
//! buildArgs = { VERSION = { cmd = "git describe --tags", default = "dev" } }
//!
//! [containers.app.linuxPlatforms.amd64]   # one platform
//! platform_slug = "linux/amd64"
//! ```
//!
//! Raw documents deserialize into [`Config`]. [`validate_config`] merges the levels
//! into [`FinalizedConfig`] and [`resolve_config`] additionally renders template
//! placeholders in the finalized tree.
//!
//! # Modules
//!
//! - [`types`]: raw document types
//! - [`finalized`]: validated output types
//! - [`validation`]: defaults merging and checks
//! - `parser`: toml, json and yaml parsing
//! - `resolver`: validation plus rendering

pub mod finalized;
mod parser;
mod resolver;
pub mod types;
pub mod validation;


pub use finalized::{
    FinalizedBuildArgConfig, FinalizedConfig, FinalizedContainerConfig, FinalizedDefaults,
    FinalizedPlatformConfig, FinalizedRepositoryConfig,
};
pub use parser::{ConfigFormat, parse_config_str, read_config_source};
pub use resolver::resolve_config;
pub use types::{
    BuildArgConfig, BuildArgPrecedence, CiConfig, CiValue, Config, ConfigDefaults,
    ContainerConfig, PlatformConfig, PlatformOs, RepositoryConfig,
};
pub use validation::{
    validate_build_arg_config, validate_config, validate_config_defaults,
    validate_container_config, validate_platform_config, validate_repository_config,
};

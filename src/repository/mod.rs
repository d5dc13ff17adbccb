//! Repository login dispatch.
//!
//! A repository's `type` selects a login strategy from a [`RepositoryRegistry`].
//! The registry maps type names to factories and is populated at startup; only
//! `standard` (username/password login) is built in, but callers can register
//! their own strategies.
//!
//! [`login_to_repositories`] is a lazy stream: each element renders one repository
//! record, masks its password, and logs in. The first failure is yielded and ends
//! the stream.

mod standard;

pub use standard::StandardRepository;

use anyhow::Result;
use futures::stream::{self, Stream};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

use crate::ci;
use crate::config::FinalizedRepositoryConfig;
use crate::core::ContainerCiError;
use crate::engine::ContainerEngine;
use crate::templating::{TemplateRenderer, TemplateVars};

/// A login strategy for one repository type.
pub trait RepositoryLogin: Send + Sync {
    /// The `type` value this strategy handles.
    fn repository_type(&self) -> &str;

    /// Authenticate the engine against an already-rendered repository.
    fn login<'a>(
        &'a self,
        repository: &'a FinalizedRepositoryConfig,
        engine: &'a dyn ContainerEngine,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

type LoginFactory = Box<dyn Fn() -> Box<dyn RepositoryLogin> + Send + Sync>;

/// Type name → strategy factory.
pub struct RepositoryRegistry {
    factories: HashMap<String, LoginFactory>,
}

impl RepositoryRegistry {
    /// A registry with no strategies.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in `standard` strategy.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(StandardRepository::TYPE, || Box::new(StandardRepository));
        registry
    }

    /// Register or replace the factory for `repository_type`.
    pub fn register<F>(&mut self, repository_type: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn RepositoryLogin> + Send + Sync + 'static,
    {
        self.factories.insert(repository_type.into(), Box::new(factory));
    }

    /// Build the strategy for `repository_type`.
    pub fn create(&self, repository_type: &str) -> Result<Box<dyn RepositoryLogin>> {
        let factory = self.factories.get(repository_type).ok_or_else(|| {
            ContainerCiError::UnknownRepositoryType {
                type_name: repository_type.to_string(),
            }
        })?;
        Ok(factory())
    }

    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    /// Repository name in the config
    pub name: String,
    /// The repository with its fields rendered
    pub repository: FinalizedRepositoryConfig,
}

/// Render every string field of a repository record.
pub fn render_repository(
    repository: &FinalizedRepositoryConfig,
    vars: &TemplateVars,
) -> Result<FinalizedRepositoryConfig> {
    let renderer = TemplateRenderer::new(vars);
    Ok(FinalizedRepositoryConfig {
        repository_type: renderer.render(&repository.repository_type)?,
        registry: renderer.render(&repository.registry)?,
        repository: renderer.render(&repository.repository)?,
        username: renderer.render_opt(repository.username.as_deref())?,
        password: renderer.render_opt(repository.password.as_deref())?,
    })
}

/// Log in to each repository in order, lazily.
///
/// Nothing happens until the stream is polled. Logins run one at a time and the
/// stream ends after the first error.
pub fn login_to_repositories<'a, I>(
    repositories: I,
    vars: &'a TemplateVars,
    registry: &'a RepositoryRegistry,
    engine: &'a dyn ContainerEngine,
) -> impl Stream<Item = Result<LoginResult>> + 'a
where
    I: IntoIterator<Item = (&'a String, &'a FinalizedRepositoryConfig)>,
    I::IntoIter: 'a,
{
    stream::unfold((repositories.into_iter(), false), move |(mut pending, failed)| async move {
        if failed {
            return None;
        }
        let (name, repository) = pending.next()?;
        let result = login_one(name, repository, vars, registry, engine).await;
        let failed = result.is_err();
        Some((result, (pending, failed)))
    })
}

async fn login_one(
    name: &str,
    repository: &FinalizedRepositoryConfig,
    vars: &TemplateVars,
    registry: &RepositoryRegistry,
    engine: &dyn ContainerEngine,
) -> Result<LoginResult> {
    debug!("Preparing login for repository {}", name);
    let rendered = render_repository(repository, vars)?;

    if let Some(password) = &rendered.password {
        ci::register_secret(password);
    }

    let strategy = registry.create(&rendered.repository_type)?;
    info!("Logging in to {} ({})", rendered.registry, strategy.repository_type());
    strategy.login(&rendered, engine).await?;

    Ok(LoginResult {
        name: name.to_string(),
        repository: rendered,
    })
}

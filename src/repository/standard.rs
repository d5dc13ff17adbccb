//! Username/password login.

use anyhow::{Context, Result};
use std::future::Future;
use std::pin::Pin;

use super::RepositoryLogin;
use crate::config::FinalizedRepositoryConfig;
use crate::engine::{ContainerEngine, EngineInvocation};

/// `engine login <registry> -u <username> -p <password>`.
///
/// Missing credentials are simply left off the command line, which lets the engine
/// fall back to credentials it already holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRepository;

impl StandardRepository {
    pub const TYPE: &'static str = "standard";
}

impl RepositoryLogin for StandardRepository {
    fn repository_type(&self) -> &str {
        Self::TYPE
    }

    fn login<'a>(
        &'a self,
        repository: &'a FinalizedRepositoryConfig,
        engine: &'a dyn ContainerEngine,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let invocation = EngineInvocation::Login {
                registry: repository.registry.clone(),
                username: repository.username.clone(),
                password: repository.password.clone(),
            };
            engine
                .run(&invocation)
                .await
                .with_context(|| format!("Failed to log in to {}", repository.registry))
        })
    }
}

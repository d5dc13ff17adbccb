//! Template variables and rendering.
//!
//! Config strings may contain two kinds of placeholders:
//!
//! - `{{ NAME }}` tera expressions, used by tag templates, credentials and any
//!   user-authored string. `{{ env.NAME }}` reaches the same environment values.
//! - `${NAME}` references, used by the built-in path fallbacks such as
//!   `${GIT_PROJECT_ROOT}/Containerfile`.
//!
//! Both resolve against a [`TemplateVars`] value: a snapshot of the process
//! environment taken once at startup plus caller-supplied extras
//! (`GIT_PROJECT_ROOT`, `CONTAINER_NAME`, `ARCH`, ...). Extras shadow environment
//! variables of the same name. Passing the snapshot explicitly keeps the resolver
//! deterministic under test.

mod renderer;

pub use renderer::TemplateRenderer;

use std::collections::BTreeMap;
use tera::Context as TeraContext;

/// Variables available to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    env: BTreeMap<String, String>,
    extras: BTreeMap<String, String>,
}

impl TemplateVars {
    /// Empty variable set (no environment).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_env(std::env::vars())
    }

    /// Build a variable set from an explicit environment.
    pub fn with_env<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            extras: BTreeMap::new(),
        }
    }

    /// Add an extra variable, returning the updated set.
    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace an extra variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.extras.insert(name.into(), value.into());
    }

    /// Look up a variable, extras first.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.extras.get(name).or_else(|| self.env.get(name)).map(String::as_str)
    }

    /// Look up an environment variable from the snapshot, ignoring extras.
    ///
    /// Empty values are reported as absent.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str).filter(|value| !value.is_empty())
    }

    /// All variable names visible at the top level of a template.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> =
            self.env.keys().chain(self.extras.keys()).map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Build the tera context: environment at top level and under `env`, then extras.
    pub fn to_tera_context(&self) -> TeraContext {
        let mut context = TeraContext::new();
        for (name, value) in &self.env {
            context.insert(name.as_str(), value);
        }
        context.insert("env", &self.env);
        for (name, value) in &self.extras {
            context.insert(name.as_str(), value);
        }
        context
    }
}

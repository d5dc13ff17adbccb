//! Test utilities for containerci
//!
//! Shared helpers for unit and integration tests:
//! - [`init_test_logging`] wires tracing output into the test harness
//! - [`RecordingEngine`] stands in for the container engine and records every
//!   invocation instead of running it
//! - [`fixtures`] holds sample configs in each supported format
//!
//! # Example
//!
//! ```rust,no_run
//! use containerci_cli::engine::{ContainerEngine, EngineInvocation};
//! use containerci_cli::test_utils::RecordingEngine;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let engine = RecordingEngine::new();
//! engine.run(&EngineInvocation::Push { tag: "app:1".into() }).await?;
//! assert_eq!(engine.invocations().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::core::ContainerCiError;
use crate::engine::{ContainerEngine, EngineInvocation};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with neither,
/// logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Container engine that records invocations instead of running them.
///
/// A recording engine built with [`RecordingEngine::failing_on`] records the
/// matching invocation and then fails it, the way a real engine exits non-zero.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    invocations: Mutex<Vec<EngineInvocation>>,
    fail_on: Option<&'static str>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation whose [`EngineInvocation::operation`] is `operation`.
    pub fn failing_on(operation: &'static str) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            fail_on: Some(operation),
        }
    }

    /// Everything run so far, in order.
    pub fn invocations(&self) -> Vec<EngineInvocation> {
        self.invocations.lock().map(|recorded| recorded.clone()).unwrap_or_default()
    }
}

impl ContainerEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn run<'a>(
        &'a self,
        invocation: &'a EngineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut recorded) = self.invocations.lock() {
                recorded.push(invocation.clone());
            }
            if self.fail_on == Some(invocation.operation()) {
                return Err(ContainerCiError::EngineCommand {
                    operation: invocation.operation().to_string(),
                    stderr: "simulated failure".to_string(),
                }
                .into());
            }
            Ok(())
        })
    }
}

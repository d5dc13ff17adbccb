//! Integration test suite for containerci
//!
//! End-to-end tests that drive the library through its public API and the
//! `containerci` binary through its CI inputs.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: argument and input handling of the binary
//! - **config_resolution**: parsing, validation and rendering across formats
//! - **pipeline**: matrix → build → combine → manifest through the binary
//! - **manifest_flow**: library-level manifest assembly from build outputs

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod config_resolution;
mod manifest_flow;
mod pipeline;

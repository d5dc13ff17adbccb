//! Core types shared by every containerci module.
//!
//! Currently this is the error system: [`ContainerCiError`] for typed failures and
//! [`ErrorContext`] / [`user_friendly_error`] for presenting them in a CI log.

pub mod error;

pub use error::{ContainerCiError, ErrorContext, user_friendly_error};

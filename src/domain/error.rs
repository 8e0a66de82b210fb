//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator.

use thiserror::Error;

/// Errors related to package identity.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Invalid package name '{0}': expected dot-separated identifiers")]
    InvalidName(String),
}

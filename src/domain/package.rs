//! User identity and package-name validation.

use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::PackageError;

/// Platform user/profile identifier. Every package query and deletion is
/// scoped to exactly one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validates a package name.
///
/// A valid name is one or more dot-separated segments; each segment contains
/// only ASCII alphanumerics and underscores and does not start with a digit.
///
/// # Errors
///
/// Returns an error if the name doesn't match the expected format.
pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PackageError::InvalidName(name.to_string()).into());
    }
    for segment in name.split('.') {
        let starts_ok = segment
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let rest_ok = segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !starts_ok || !rest_ok {
            return Err(PackageError::InvalidName(name.to_string()).into());
        }
    }
    Ok(())
}

//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod candidates;
pub mod directive;
pub mod error;
pub mod package;

pub use candidates::deletion_candidates;
pub use directive::CleanupDirective;
pub use error::PackageError;
pub use package::{UserId, validate_package_name};

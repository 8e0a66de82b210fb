//! Port trait definitions for the application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the application layer's
//! own plumbing — never from `crate::infra` or `crate::commands`.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::application::outcome::DeletionSink;
use crate::domain::UserId;

// ── App-Set Resolver Port ─────────────────────────────────────────────────────

/// Resolves the externally supplied app-name sets for one user.
///
/// Either query may fail independently. `Err` means the set could not be
/// determined; it is distinct from an empty set, which means "nothing to
/// delete".
#[allow(async_fn_in_trait)]
pub trait AppSetResolver {
    /// Packages not required on a managed device for `user`.
    async fn non_required_apps(&self, user: UserId) -> Result<BTreeSet<String>>;

    /// System packages that appeared since the last provisioning snapshot.
    async fn new_system_apps(&self, user: UserId) -> Result<BTreeSet<String>>;
}

// ── Installed-Package Oracle Port ─────────────────────────────────────────────

/// Reports whether a package is currently installed as a system app.
#[allow(async_fn_in_trait)]
pub trait PackageInventory {
    /// `Ok(false)` when the package is not present for `user`; `Err` only
    /// when the inventory itself cannot be consulted.
    async fn is_installed_system_app(&self, package: &str, user: UserId) -> Result<bool>;
}

// ── Deletion Port ─────────────────────────────────────────────────────────────

/// Asynchronously removes system applications, one request per package.
///
/// Implementations must eventually complete `sink` exactly once per call,
/// from any execution context and at any time after issuance. The removal
/// must target the *system* variant of the package and must be scoped to
/// `user`.
pub trait PackageDeleter {
    fn delete_system_app(&self, package: &str, user: UserId, sink: DeletionSink);
}

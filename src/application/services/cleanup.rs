//! Application service — provisioning-time cleanup use-case.
//!
//! Imports only from `crate::domain` and the application layer.
//! All I/O is routed through injected port traits.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::application::outcome::{DeletionSink, ERROR_DELETING_APPS, JoinState, TaskCallback};
use crate::application::ports::{AppSetResolver, PackageDeleter, PackageInventory};
use crate::domain::{CleanupDirective, UserId, deletion_candidates};

/// Remove the non-required system apps for `user`.
///
/// Resolves the app-name sets, computes the deletion candidates, issues one
/// asynchronous removal per candidate, and reports exactly one terminal
/// result through `callback` once every issued removal has completed.
/// Returns to the caller right after fan-out; the callback may fire later,
/// from whichever execution context delivers the final completion.
///
/// When `directive.leave_all_system_apps_enabled` is set, no collaborator is
/// consulted and the run succeeds immediately. A failed set resolution or
/// inventory query terminates the run with an error before any removal is
/// issued.
pub async fn delete_non_required_apps(
    directive: &CleanupDirective,
    user: UserId,
    resolver: &impl AppSetResolver,
    inventory: &impl PackageInventory,
    deleter: &impl PackageDeleter,
    callback: Arc<dyn TaskCallback>,
) {
    if directive.leave_all_system_apps_enabled {
        debug!(%user, "all system apps left enabled; nothing to delete");
        callback.on_success();
        return;
    }

    let candidates = match resolve_candidates(user, resolver, inventory).await {
        Ok(candidates) => candidates,
        Err(error) => {
            warn!(%user, error = format!("{error:#}"), "could not determine apps to delete");
            callback.on_error(ERROR_DELETING_APPS);
            return;
        }
    };

    if candidates.is_empty() {
        info!(%user, "no non-required system apps to delete");
        callback.on_success();
        return;
    }

    info!(%user, count = candidates.len(), "deleting non-required system apps");

    // The counter covers the full candidate set before the first removal is
    // issued, so a removal that completes synchronously during fan-out
    // cannot reach zero early.
    let join = JoinState::new(candidates.len(), callback);
    for package in candidates {
        let sink = DeletionSink::new(package.clone(), Arc::clone(&join));
        deleter.delete_system_app(&package, user, sink);
    }
}

/// Resolve both app-name sets and filter to presently installed packages.
///
/// Only packages in the intersection of the two sets are checked against the
/// inventory. Any failed lookup aborts candidate computation.
pub async fn resolve_candidates(
    user: UserId,
    resolver: &impl AppSetResolver,
    inventory: &impl PackageInventory,
) -> Result<BTreeSet<String>> {
    let non_required = resolver
        .non_required_apps(user)
        .await
        .context("resolving non-required apps")?;
    let new_system = resolver
        .new_system_apps(user)
        .await
        .context("resolving new system apps")?;

    let mut installed = BTreeSet::new();
    for package in non_required.intersection(&new_system) {
        if inventory
            .is_installed_system_app(package, user)
            .await
            .with_context(|| format!("querying installed state of {package}"))?
        {
            installed.insert(package.clone());
        }
    }

    Ok(deletion_candidates(&non_required, &new_system, |p| {
        installed.contains(p)
    }))
}

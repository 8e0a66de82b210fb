//! Deletion-set calculator.

use std::collections::BTreeSet;

/// Compute the set of packages eligible for removal.
///
/// The result is `non_required ∩ new_system`, retaining only packages the
/// `is_installed` predicate confirms are presently installed for the target
/// user. Pure and deterministic; input order is irrelevant and the result is
/// an unordered set (`BTreeSet` for stable iteration in logs).
pub fn deletion_candidates<F>(
    non_required: &BTreeSet<String>,
    new_system: &BTreeSet<String>,
    mut is_installed: F,
) -> BTreeSet<String>
where
    F: FnMut(&str) -> bool,
{
    non_required
        .intersection(new_system)
        .filter(|package| is_installed(package))
        .cloned()
        .collect()
}

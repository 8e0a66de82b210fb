//! Run configuration for the provisioning cleanup step.

use serde::{Deserialize, Serialize};

/// Immutable configuration for one cleanup run.
///
/// Carries the subset of the provisioning parameters the cleanup step reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupDirective {
    /// When true, no bundled app is ever a deletion candidate and the run
    /// succeeds without consulting any collaborator.
    #[serde(default)]
    pub leave_all_system_apps_enabled: bool,
}

//! Device-backed implementation of the `AppSetResolver` port.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::AppSetResolver;
use crate::domain::{UserId, validate_package_name};
use crate::infra::adb::Adb;
use crate::infra::command_runner::CommandRunner;
use crate::infra::snapshot::SnapshotStore;

/// Required-apps policy loaded from YAML.
///
/// Packages listed here are never deletion candidates, whatever the device
/// reports. A missing or unreadable policy file is a resolution failure, not
/// an empty policy.
#[derive(Debug, Default, Deserialize)]
pub struct RequiredAppsPolicy {
    #[serde(default)]
    pub required_apps: BTreeSet<String>,
}

impl RequiredAppsPolicy {
    /// Load the policy from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// entry is not a well-formed package name.
    pub async fn load(path: &Path) -> Result<Self> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading policy {}", path.display()))?;
            let policy: Self = serde_yaml::from_str(&content)
                .with_context(|| format!("parsing policy {}", path.display()))?;
            for package in &policy.required_apps {
                validate_package_name(package)
                    .with_context(|| format!("invalid policy entry in {}", path.display()))?;
            }
            Ok(policy)
        })
        .await
        .context("policy load task")?
    }
}

/// Resolver combining the live device package list, the required-apps
/// policy, and the stored provisioning snapshot.
///
/// Both queries are read-only; [`DeviceAppSetResolver::record_snapshot`]
/// persists the current package list once the enclosing run has succeeded,
/// so a retried run still sees the same "new" set.
pub struct DeviceAppSetResolver<R> {
    adb: Arc<Adb<R>>,
    policy_path: PathBuf,
    snapshots: SnapshotStore,
}

impl<R: CommandRunner> DeviceAppSetResolver<R> {
    #[must_use]
    pub fn new(adb: Arc<Adb<R>>, policy_path: PathBuf, snapshots: SnapshotStore) -> Self {
        Self {
            adb,
            policy_path,
            snapshots,
        }
    }

    /// Record the current system-app set as the provisioning snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be queried or the snapshot
    /// cannot be written.
    pub async fn record_snapshot(&self, user: UserId) -> Result<()> {
        let current = self.adb.list_system_packages(user).await?;
        self.snapshots.save(user, &current).await
    }
}

impl<R: CommandRunner> AppSetResolver for DeviceAppSetResolver<R> {
    async fn non_required_apps(&self, user: UserId) -> Result<BTreeSet<String>> {
        let policy = RequiredAppsPolicy::load(&self.policy_path)
            .await
            .with_context(|| {
                format!("loading required-apps policy {}", self.policy_path.display())
            })?;
        let current = self.adb.list_system_packages(user).await?;
        debug!(
            %user,
            system = current.len(),
            required = policy.required_apps.len(),
            "resolved non-required apps"
        );
        Ok(current
            .difference(&policy.required_apps)
            .cloned()
            .collect())
    }

    async fn new_system_apps(&self, user: UserId) -> Result<BTreeSet<String>> {
        let current = self.adb.list_system_packages(user).await?;
        match self.snapshots.load(user).await? {
            // First provisioning run: every bundled app counts as new.
            None => Ok(current),
            Some(previous) => Ok(current.difference(&previous).cloned().collect()),
        }
    }
}

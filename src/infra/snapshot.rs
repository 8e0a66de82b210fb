//! Persistence of the per-user system-app snapshot.
//!
//! The snapshot records which system packages were present when provisioning
//! last completed; the resolver diffs the live package list against it to
//! find newly added system apps.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::UserId;

/// Snapshot store — one JSON file per user under the state directory.
///
/// Async load/save via `tokio::task::spawn_blocking`, with atomic write
/// (temp file + rename) to prevent snapshot corruption.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("system_apps.{user}.json"))
    }

    /// Load the snapshot for `user`, returning `None` if none was recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self, user: UserId) -> Result<Option<BTreeSet<String>>> {
        let path = self.path_for(user);
        tokio::task::spawn_blocking(move || {
            if !path.exists() {
                return Ok(None);
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let packages: BTreeSet<String> = serde_json::from_str(&content)
                .with_context(|| format!("parsing snapshot {}", path.display()))?;
            Ok(Some(packages))
        })
        .await
        .context("snapshot load task")?
    }

    /// Persist the snapshot for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be created or the file
    /// cannot be written.
    pub async fn save(&self, user: UserId, packages: &BTreeSet<String>) -> Result<()> {
        let path = self.path_for(user);
        let content = serde_json::to_string_pretty(packages).context("serializing snapshot")?;
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
            let temp_path = path.with_extension("json.tmp");
            std::fs::write(&temp_path, content)
                .with_context(|| format!("writing {}", temp_path.display()))?;
            std::fs::rename(&temp_path, &path)
                .with_context(|| format!("moving {} into place", temp_path.display()))?;
            Ok(())
        })
        .await
        .context("snapshot save task")?
    }
}

//! `appcull list` — show the current deletion candidates.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::application::services::cleanup::resolve_candidates;
use crate::domain::UserId;
use crate::infra::adb::Adb;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::resolver::DeviceAppSetResolver;
use crate::infra::snapshot::SnapshotStore;

#[derive(Args)]
pub struct ListArgs {
    /// Target user id
    #[arg(long)]
    pub user: i32,

    /// Required-apps policy file (YAML)
    #[arg(long, default_value = "appcull.yaml")]
    pub policy: PathBuf,

    /// Directory holding provisioning snapshots
    #[arg(long, default_value = ".appcull")]
    pub state_dir: PathBuf,

    /// adb device serial (defaults to the only connected device)
    #[arg(long)]
    pub serial: Option<String>,
}

/// # Errors
///
/// Returns an error when the candidate set cannot be determined.
pub async fn execute(args: ListArgs) -> Result<()> {
    let user = UserId(args.user);
    let adb = Arc::new(Adb::new(TokioCommandRunner::default(), args.serial));
    let resolver = DeviceAppSetResolver::new(
        Arc::clone(&adb),
        args.policy,
        SnapshotStore::new(args.state_dir),
    );

    let candidates = resolve_candidates(user, &resolver, adb.as_ref()).await?;
    if candidates.is_empty() {
        println!("no deletion candidates for user {user}");
    } else {
        for package in &candidates {
            println!("{package}");
        }
    }
    Ok(())
}

//! `appcull run` — execute the cleanup for one user.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use owo_colors::OwoColorize;

use crate::application::outcome::{RunOutcome, outcome_channel};
use crate::application::services::cleanup::delete_non_required_apps;
use crate::domain::{CleanupDirective, UserId};
use crate::infra::adb::Adb;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::resolver::DeviceAppSetResolver;
use crate::infra::snapshot::SnapshotStore;

#[derive(Args)]
pub struct RunArgs {
    /// Target user id
    #[arg(long)]
    pub user: i32,

    /// Required-apps policy file (YAML)
    #[arg(long, default_value = "appcull.yaml")]
    pub policy: PathBuf,

    /// Directory holding provisioning snapshots
    #[arg(long, default_value = ".appcull")]
    pub state_dir: PathBuf,

    /// Keep every bundled system app; the run succeeds without touching the device
    #[arg(long)]
    pub leave_all_system_apps_enabled: bool,

    /// adb device serial (defaults to the only connected device)
    #[arg(long)]
    pub serial: Option<String>,
}

/// # Errors
///
/// Returns an error when the cleanup reports a terminal error, or when the
/// snapshot cannot be recorded afterwards.
pub async fn execute(args: RunArgs, no_color: bool) -> Result<()> {
    let user = UserId(args.user);
    let directive = CleanupDirective {
        leave_all_system_apps_enabled: args.leave_all_system_apps_enabled,
    };

    let adb = Arc::new(Adb::new(TokioCommandRunner::default(), args.serial));
    let resolver = DeviceAppSetResolver::new(
        Arc::clone(&adb),
        args.policy,
        SnapshotStore::new(args.state_dir),
    );

    let (callback, outcome) = outcome_channel();
    delete_non_required_apps(
        &directive,
        user,
        &resolver,
        adb.as_ref(),
        adb.as_ref(),
        callback,
    )
    .await;

    match outcome.await.context("cleanup run dropped its callback")? {
        RunOutcome::Success => {
            // Later runs treat only apps added after this point as new. A
            // leave-all run never consulted the device and records nothing.
            if !directive.leave_all_system_apps_enabled {
                resolver.record_snapshot(user).await?;
            }
            let message = format!("cleanup complete for user {user}");
            if no_color {
                println!("{message}");
            } else {
                println!("{}", message.green());
            }
            Ok(())
        }
        RunOutcome::Error(code) => bail!("cleanup failed for user {user} (code {code})"),
    }
}

//! adb-backed implementations of the package inventory and deletion ports.
//!
//! All device access goes through `adb shell pm`, scoped to the target user.
//! `pm uninstall --user` removes the system variant of a package for that
//! user only; it never touches other users or the underlying image.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::application::outcome::DeletionSink;
use crate::application::ports::{PackageDeleter, PackageInventory};
use crate::domain::UserId;
use crate::infra::command_runner::CommandRunner;

/// Thin typed wrapper over `adb`, optionally pinned to one device serial.
pub struct Adb<R> {
    runner: Arc<R>,
    serial: Option<String>,
}

impl<R: CommandRunner> Adb<R> {
    #[must_use]
    pub fn new(runner: R, serial: Option<String>) -> Self {
        Self {
            runner: Arc::new(runner),
            serial,
        }
    }

    async fn shell(&self, shell_args: &[&str]) -> Result<std::process::Output> {
        run_shell(
            self.runner.as_ref(),
            self.serial.as_deref(),
            shell_args,
        )
        .await
    }

    /// System packages currently installed for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error if adb cannot be invoked or `pm` reports a failure.
    pub async fn list_system_packages(&self, user: UserId) -> Result<BTreeSet<String>> {
        let user_arg = user.to_string();
        let output = self
            .shell(&["pm", "list", "packages", "-s", "--user", &user_arg])
            .await
            .context("listing system packages")?;
        if !output.status.success() {
            bail!(
                "pm list packages failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(parse_package_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl<R: CommandRunner> PackageInventory for Adb<R> {
    async fn is_installed_system_app(&self, package: &str, user: UserId) -> Result<bool> {
        // `pm list packages <filter>` substring-matches, so compare parsed
        // names exactly instead of trusting a non-empty listing.
        let user_arg = user.to_string();
        let output = self
            .shell(&["pm", "list", "packages", "-s", "--user", &user_arg, package])
            .await
            .with_context(|| format!("querying package {package}"))?;
        if !output.status.success() {
            bail!(
                "pm list packages {package} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(parse_package_list(&String::from_utf8_lossy(&output.stdout)).contains(package))
    }
}

impl<R> PackageDeleter for Adb<R>
where
    R: CommandRunner + Send + Sync + 'static,
{
    /// Issues the removal on a spawned task and completes the sink with the
    /// parsed `pm` result. Must be called within a tokio runtime.
    fn delete_system_app(&self, package: &str, user: UserId, sink: DeletionSink) {
        let runner = Arc::clone(&self.runner);
        let serial = self.serial.clone();
        let package = package.to_owned();
        tokio::spawn(async move {
            let succeeded = uninstall(runner.as_ref(), serial.as_deref(), &package, user).await;
            sink.complete(succeeded);
        });
    }
}

async fn uninstall<R: CommandRunner>(
    runner: &R,
    serial: Option<&str>,
    package: &str,
    user: UserId,
) -> bool {
    let user_arg = user.to_string();
    let result = run_shell(
        runner,
        serial,
        &["pm", "uninstall", "--user", &user_arg, package],
    )
    .await;
    match result {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            output.status.success() && stdout.trim_start().starts_with("Success")
        }
        Err(error) => {
            warn!(package, error = format!("{error:#}"), "pm uninstall could not be invoked");
            false
        }
    }
}

async fn run_shell<R: CommandRunner>(
    runner: &R,
    serial: Option<&str>,
    shell_args: &[&str],
) -> Result<std::process::Output> {
    let mut args: Vec<&str> = Vec::new();
    if let Some(serial) = serial {
        args.extend_from_slice(&["-s", serial]);
    }
    args.push("shell");
    args.extend_from_slice(shell_args);
    runner.run("adb", &args).await
}

/// Parse `pm list packages` output: one `package:<name>` line per package.
fn parse_package_list(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(str::to_owned)
        .collect()
}
